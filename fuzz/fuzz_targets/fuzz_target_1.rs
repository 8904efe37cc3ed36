#![no_main]
use enip_scan::enip;
use libfuzzer_sys::fuzz_target;

// Exercises the resync-tolerant header scan and CPF item walk against
// arbitrary bytes. Nothing here should panic, regardless of how the
// input is truncated or garbled — that's the whole point of the resync
// scan and the declared-vs-actual length handling it feeds into.
fuzz_target!(|data: &[u8]| {
    if let Ok(parsed) = enip::parse_header(data, enip::CMD_SEND_RR_DATA) {
        let _ = enip::parse_send_rr_data_body(&parsed.header, parsed.rest);
    }
    if let Ok(parsed) = enip::parse_header(data, enip::CMD_LIST_IDENTITY) {
        let _ = enip::parse_list_identity_body(parsed.rest);
    }
});
