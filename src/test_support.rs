//! An in-process fake ENIP/CIP peer, test-only.
//!
//! Real hardware isn't available in this crate's test environment, so
//! the session/engine/discovery tests talk to a small TCP+UDP server
//! running on a background thread instead. It understands just enough
//! of the wire format to register a session, answer a handful of CIP
//! services against a configurable attribute table, and unregister.

#![cfg(test)]

use crate::codec::{read_u16, read_u8, require_bytes, write_u16, write_u32, write_u8};
use crate::enip::{self, CMD_REGISTER_SESSION, CMD_SEND_RR_DATA, CMD_UNREGISTER_SESSION, HEADER_LEN};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

const FAKE_HANDLE: u32 = 0xDEAD_BEEF;

#[derive(Default)]
struct State {
    attribute_replies: HashMap<(u32, u32, u32), Vec<u8>>,
    general_status_override: Option<u8>,
    wrong_cpf_item_type: bool,
    last_unregister_handle: Option<u32>,
    unregister_seen: bool,
}

pub struct FakeEnipServer {
    addr: SocketAddr,
    state: Arc<Mutex<State>>,
}

impl FakeEnipServer {
    pub fn spawn() -> FakeEnipServer {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake ENIP server");
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(State::default()));
        let accept_state = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let state = Arc::clone(&accept_state);
                thread::spawn(move || handle_connection(stream, state));
            }
        });
        FakeEnipServer { addr, state }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn handle(&self) -> u32 {
        FAKE_HANDLE
    }

    pub fn set_attribute_reply(&self, class: u32, instance: u32, attribute: u32, data: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .attribute_replies
            .insert((class, instance, attribute), data);
    }

    pub fn set_general_status(&self, status: u8) {
        self.state.lock().unwrap().general_status_override = Some(status);
    }

    pub fn set_wrong_cpf_item_type(&self) {
        self.state.lock().unwrap().wrong_cpf_item_type = true;
    }

    pub fn last_unregister_handle(&self) -> Option<u32> {
        self.state.lock().unwrap().last_unregister_handle
    }

    pub fn saw_unregister_within(&self, window: Duration) -> bool {
        let deadline = Instant::now() + window;
        loop {
            if self.state.lock().unwrap().unregister_seen {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }
}

fn handle_connection(mut stream: TcpStream, state: Arc<Mutex<State>>) {
    stream.set_read_timeout(Some(Duration::from_secs(5))).ok();
    loop {
        let mut header_buf = [0u8; HEADER_LEN];
        if stream.read_exact(&mut header_buf).is_err() {
            return;
        }
        let command = read_u16(&header_buf, 0).unwrap();
        let length = read_u16(&header_buf, 2).unwrap() as usize;
        let mut body = vec![0u8; length];
        if length > 0 && stream.read_exact(&mut body).is_err() {
            return;
        }

        match command {
            c if c == CMD_REGISTER_SESSION => {
                let reply = build_register_reply();
                if stream.write_all(&reply).is_err() {
                    return;
                }
            }
            c if c == CMD_UNREGISTER_SESSION => {
                let handle = read_u32_from(&header_buf);
                let mut s = state.lock().unwrap();
                s.last_unregister_handle = Some(handle);
                s.unregister_seen = true;
                return;
            }
            c if c == CMD_SEND_RR_DATA => {
                let reply = build_send_rr_data_reply(&body, &state);
                if stream.write_all(&reply).is_err() {
                    return;
                }
            }
            _ => return,
        }
    }
}

fn read_u32_from(header: &[u8; HEADER_LEN]) -> u32 {
    u32::from_le_bytes([header[4], header[5], header[6], header[7]])
}

fn build_register_reply() -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + 4);
    write_u16(&mut out, CMD_REGISTER_SESSION);
    write_u16(&mut out, 4);
    write_u32(&mut out, FAKE_HANDLE);
    write_u32(&mut out, 0); // status
    out.extend_from_slice(&[0u8; 8]); // sender context
    write_u32(&mut out, 0); // options
    write_u16(&mut out, 1); // protocol version
    write_u16(&mut out, 0); // options flags
    out
}

/// Parses just enough of a request CPF body (Null Address + Unconnected
/// Data) to get at the CIP service request bytes inside it. The wire
/// shape is identical to a reply's, so this mirrors
/// `enip::parse_send_rr_data_body`'s item walk.
fn extract_cip_request(body: &[u8]) -> Vec<u8> {
    let item1_len = read_u16(body, 10).unwrap() as usize;
    let item2_hdr_at = 12 + item1_len;
    let item2_len = read_u16(body, item2_hdr_at + 2).unwrap() as usize;
    let data_at = item2_hdr_at + 4;
    body[data_at..data_at + item2_len].to_vec()
}

struct ParsedCipRequest {
    service: u8,
    class: u32,
    instance: u32,
    attribute: Option<u32>,
}

fn parse_cip_path(cip: &[u8]) -> ParsedCipRequest {
    let service = read_u8(cip, 0).unwrap();
    let path_words = read_u8(cip, 1).unwrap() as usize;
    let path = &cip[2..2 + path_words * 2];

    let mut class = 0u32;
    let mut instance = 0u32;
    let mut attribute = None;
    let mut at = 0;
    while at < path.len() {
        match path[at] {
            0x20 => {
                class = path[at + 1] as u32;
                at += 2;
            }
            0x21 => {
                class = u16::from_le_bytes([path[at + 2], path[at + 3]]) as u32;
                at += 4;
            }
            0x24 => {
                instance = path[at + 1] as u32;
                at += 2;
            }
            0x25 => {
                instance = u16::from_le_bytes([path[at + 2], path[at + 3]]) as u32;
                at += 4;
            }
            0x30 => {
                attribute = Some(path[at + 1] as u32);
                at += 2;
            }
            0x31 => {
                attribute = Some(u16::from_le_bytes([path[at + 2], path[at + 3]]) as u32);
                at += 4;
            }
            0 => at += 1, // trailing pad byte
            _ => break,
        }
    }
    ParsedCipRequest {
        service,
        class,
        instance,
        attribute,
    }
}

fn build_send_rr_data_reply(request_body: &[u8], state: &Arc<Mutex<State>>) -> Vec<u8> {
    let s = state.lock().unwrap();
    let cip_request = extract_cip_request(request_body);
    let parsed = parse_cip_path(&cip_request);

    let mut cip_reply = Vec::new();
    write_u8(&mut cip_reply, parsed.service | 0x80);
    write_u8(&mut cip_reply, 0); // reserved
    let status = s.general_status_override.unwrap_or(0);
    write_u8(&mut cip_reply, status);
    write_u8(&mut cip_reply, 0); // additional status size words
    if status == 0 {
        let data = s
            .attribute_replies
            .get(&(parsed.class, parsed.instance, parsed.attribute.unwrap_or(0)))
            .cloned()
            .unwrap_or_default();
        cip_reply.extend_from_slice(&data);
    }

    let mut enip_body = Vec::new();
    write_u32(&mut enip_body, 0); // interface handle
    write_u16(&mut enip_body, 0); // cip timeout
    write_u16(&mut enip_body, 2); // item count
    write_u16(&mut enip_body, enip::CPF_NULL_ADDRESS);
    write_u16(&mut enip_body, 0);
    if s.wrong_cpf_item_type {
        write_u16(&mut enip_body, 0x00A1); // deliberately wrong
    } else {
        write_u16(&mut enip_body, enip::CPF_UNCONNECTED_DATA);
    }
    write_u16(&mut enip_body, cip_reply.len() as u16);
    enip_body.extend_from_slice(&cip_reply);

    let mut out = Vec::with_capacity(HEADER_LEN + enip_body.len());
    write_u16(&mut out, CMD_SEND_RR_DATA);
    write_u16(&mut out, enip_body.len() as u16);
    write_u32(&mut out, FAKE_HANDLE);
    write_u32(&mut out, 0);
    out.extend_from_slice(&[0u8; 8]);
    write_u32(&mut out, 0);
    out.extend_from_slice(&enip_body);
    require_bytes(&out, HEADER_LEN).unwrap();
    out
}
