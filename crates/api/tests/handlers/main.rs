mod test_utils;

mod appointments_test;
mod chat_test;
mod middleware_test;
mod router_test;
