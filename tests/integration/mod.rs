// Integration tests organized by area

#[path = "../common/mod.rs"]
mod common;

mod test_end_to_end;
mod test_routes;
