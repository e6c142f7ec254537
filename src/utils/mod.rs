pub mod backend_call;
