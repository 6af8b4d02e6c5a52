#![no_main]

use libfuzzer_sys::fuzz_target;
use reactord::http::request;

fuzz_target!(|data: &[u8]| {
    let _ = request::parse(data);
});
