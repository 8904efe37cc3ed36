extern crate afl;
extern crate enip_scan;

use afl::fuzz;
use enip_scan::enip;

fn main() {
    fuzz!(|data: &[u8]| {
        if let Ok(parsed) = enip::parse_header(data, enip::CMD_SEND_RR_DATA) {
            match enip::parse_send_rr_data_body(&parsed.header, parsed.rest) {
                Ok(reply) => println!("ok: {} CIP bytes", reply.cip_bytes.len()),
                Err(e) => eprintln!("{}", e),
            }
        }
    });
}
