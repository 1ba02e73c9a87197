// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Session messages: `[1-byte type][payload]`.
//!
//! All integers are little-endian. Strings are `u16` length + UTF-8 except
//! hash strings, which are `u8` length + ASCII. Tick input payloads whose
//! first byte is `{` or `[` are UTF-8 JSON by convention; everything else is
//! opaque bytes — the kernel never looks inside either way.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::value::DecodeError;

/// Message type codes.
pub mod codes {
    /// Authority tick with confirmed inputs.
    pub const TICK: u8 = 0x01;
    /// Full join payload: snapshot plus input history.
    pub const INITIAL_STATE: u8 = 0x02;
    /// Room membership acknowledgement.
    pub const ROOM_JOINED: u8 = 0x03;
    /// Room creation acknowledgement.
    pub const ROOM_CREATED: u8 = 0x04;
    /// Server-side error report.
    pub const ERROR: u8 = 0x05;
    /// Authority snapshot broadcast.
    pub const SNAPSHOT_UPDATE: u8 = 0x06;
    /// Peer departure notice.
    pub const ROOM_LEFT: u8 = 0x07;
    /// Bare state-hash exchange for drift checks.
    pub const SYNC_HASH: u8 = 0x08;
    /// Connected-client roster update.
    pub const CLIENT_LIST_UPDATE: u8 = 0x09;
    /// Single binary input (client → server).
    pub const BINARY_INPUT: u8 = 0x20;
    /// Binary snapshot blob (server → client).
    pub const BINARY_SNAPSHOT: u8 = 0x21;
    /// Snapshot upload (client → server).
    pub const SEND_SNAPSHOT: u8 = 0x23;
}

/// One client's input within a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickInput {
    /// FNV-1a abbreviation of the client id.
    pub client_hash: u32,
    /// Client-local input sequence number.
    pub seq: u32,
    /// Opaque payload.
    pub data: Bytes,
}

impl TickInput {
    /// Whether the payload is UTF-8 JSON by the first-byte convention.
    #[must_use]
    pub fn is_json(&self) -> bool {
        matches!(self.data.first(), Some(&b'{') | Some(&b'['))
    }
}

/// Authority tick message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickMessage {
    /// Frame the inputs apply to.
    pub frame: u32,
    /// Frame of the authority's last broadcast snapshot, when attached.
    pub snapshot_frame: Option<u32>,
    /// Hex state hash at `snapshot_frame`, when attached.
    pub snapshot_hash: Option<String>,
    /// Confirmed inputs, one per client.
    pub inputs: Vec<TickInput>,
}

/// One history frame inside an `INITIAL_STATE` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryFrame {
    /// Frame number.
    pub frame: u32,
    /// Whether the authority confirmed this frame.
    pub confirmed: bool,
    /// `(client hash, payload)` pairs, ascending client hash.
    pub inputs: Vec<(u32, Bytes)>,
}

/// Join payload: the world snapshot plus the input history tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialStateMessage {
    /// Frame the snapshot captures.
    pub frame: u32,
    /// Room identifier.
    pub room_id: String,
    /// Encoded world snapshot.
    pub snapshot: Bytes,
    /// Input history, ascending frame order.
    pub history: Vec<HistoryFrame>,
}

/// Snapshot upload from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendSnapshotMessage {
    /// Sender's sequence number.
    pub seq: u32,
    /// Frame the snapshot captures.
    pub frame: u32,
    /// Hex state hash at that frame.
    pub hash: String,
    /// Encoded world snapshot.
    pub data: Bytes,
}

/// A framed session message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Authority tick.
    Tick(TickMessage),
    /// Join payload.
    InitialState(InitialStateMessage),
    /// Room join acknowledgement.
    RoomJoined {
        /// Room identifier.
        room_id: String,
        /// The joining client's id.
        client_id: String,
    },
    /// Room creation acknowledgement.
    RoomCreated {
        /// Room identifier.
        room_id: String,
    },
    /// Server error.
    Error {
        /// Numeric error code.
        code: u16,
        /// Human-readable description.
        message: String,
    },
    /// Authority snapshot broadcast.
    SnapshotUpdate {
        /// Frame the snapshot captures.
        frame: u32,
        /// Encoded world snapshot.
        data: Bytes,
    },
    /// Peer departure.
    RoomLeft {
        /// The departing client's id.
        client_id: String,
    },
    /// Bare hash exchange for drift checks.
    SyncHash {
        /// Frame the hash was computed at.
        frame: u32,
        /// Hex state hash.
        hash: String,
    },
    /// Connected-client roster.
    ClientListUpdate {
        /// Client ids, in the server's order.
        clients: Vec<String>,
    },
    /// Single binary input.
    BinaryInput {
        /// Frame the input applies to.
        frame: u32,
        /// The input itself.
        input: TickInput,
    },
    /// Binary snapshot blob.
    BinarySnapshot {
        /// Frame the snapshot captures.
        frame: u32,
        /// Encoded world snapshot.
        data: Bytes,
    },
    /// Snapshot upload.
    SendSnapshot(SendSnapshotMessage),
}

impl Message {
    /// The message's wire type code.
    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            Self::Tick(_) => codes::TICK,
            Self::InitialState(_) => codes::INITIAL_STATE,
            Self::RoomJoined { .. } => codes::ROOM_JOINED,
            Self::RoomCreated { .. } => codes::ROOM_CREATED,
            Self::Error { .. } => codes::ERROR,
            Self::SnapshotUpdate { .. } => codes::SNAPSHOT_UPDATE,
            Self::RoomLeft { .. } => codes::ROOM_LEFT,
            Self::SyncHash { .. } => codes::SYNC_HASH,
            Self::ClientListUpdate { .. } => codes::CLIENT_LIST_UPDATE,
            Self::BinaryInput { .. } => codes::BINARY_INPUT,
            Self::BinarySnapshot { .. } => codes::BINARY_SNAPSHOT,
            Self::SendSnapshot(_) => codes::SEND_SNAPSHOT,
        }
    }

    /// Encodes the message with its leading type byte.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u8(self.code());
        match self {
            Self::Tick(tick) => {
                buf.put_u32_le(tick.frame);
                let mut flags = 0_u8;
                if tick.snapshot_frame.is_some() {
                    flags |= 1;
                }
                if tick.snapshot_hash.is_some() {
                    flags |= 2;
                }
                buf.put_u8(flags);
                if let Some(frame) = tick.snapshot_frame {
                    buf.put_u32_le(frame);
                }
                if let Some(hash) = &tick.snapshot_hash {
                    put_hash(&mut buf, hash);
                }
                buf.put_u8(tick.inputs.len().min(255) as u8);
                for input in tick.inputs.iter().take(255) {
                    buf.put_u32_le(input.client_hash);
                    buf.put_u32_le(input.seq);
                    buf.put_u16_le(input.data.len().min(65535) as u16);
                    buf.put_slice(&input.data[..input.data.len().min(65535)]);
                }
            }
            Self::InitialState(state) => {
                buf.put_u32_le(state.frame);
                put_str(&mut buf, &state.room_id);
                buf.put_u32_le(state.snapshot.len() as u32);
                buf.put_slice(&state.snapshot);
                buf.put_u16_le(state.history.len().min(65535) as u16);
                for frame in state.history.iter().take(65535) {
                    buf.put_u32_le(frame.frame);
                    buf.put_u8(u8::from(frame.confirmed));
                    buf.put_u8(frame.inputs.len().min(255) as u8);
                    for (client, data) in frame.inputs.iter().take(255) {
                        buf.put_u32_le(*client);
                        buf.put_u16_le(data.len().min(65535) as u16);
                        buf.put_slice(&data[..data.len().min(65535)]);
                    }
                }
            }
            Self::RoomJoined { room_id, client_id } => {
                put_str(&mut buf, room_id);
                put_str(&mut buf, client_id);
            }
            Self::RoomCreated { room_id } => put_str(&mut buf, room_id),
            Self::Error { code, message } => {
                buf.put_u16_le(*code);
                put_str(&mut buf, message);
            }
            Self::SnapshotUpdate { frame, data } | Self::BinarySnapshot { frame, data } => {
                buf.put_u32_le(*frame);
                buf.put_u32_le(data.len() as u32);
                buf.put_slice(data);
            }
            Self::RoomLeft { client_id } => put_str(&mut buf, client_id),
            Self::SyncHash { frame, hash } => {
                buf.put_u32_le(*frame);
                put_hash(&mut buf, hash);
            }
            Self::ClientListUpdate { clients } => {
                buf.put_u8(clients.len().min(255) as u8);
                for client in clients.iter().take(255) {
                    put_str(&mut buf, client);
                }
            }
            Self::BinaryInput { frame, input } => {
                buf.put_u32_le(*frame);
                buf.put_u32_le(input.client_hash);
                buf.put_u32_le(input.seq);
                buf.put_u16_le(input.data.len().min(65535) as u16);
                buf.put_slice(&input.data[..input.data.len().min(65535)]);
            }
            Self::SendSnapshot(send) => {
                buf.put_u32_le(send.seq);
                buf.put_u32_le(send.frame);
                put_hash(&mut buf, &send.hash);
                buf.put_u32_le(send.data.len() as u32);
                buf.put_slice(&send.data);
            }
        }
        buf.freeze()
    }

    /// Decodes a framed message.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut cur = bytes;
        let code = take_u8(&mut cur)?;
        match code {
            codes::TICK => {
                let frame = take_u32(&mut cur)?;
                let flags = take_u8(&mut cur)?;
                let snapshot_frame = if flags & 1 != 0 {
                    Some(take_u32(&mut cur)?)
                } else {
                    None
                };
                let snapshot_hash = if flags & 2 != 0 {
                    Some(take_hash(&mut cur)?)
                } else {
                    None
                };
                let count = take_u8(&mut cur)?;
                let mut inputs = Vec::with_capacity(usize::from(count));
                for _ in 0..count {
                    let client_hash = take_u32(&mut cur)?;
                    let seq = take_u32(&mut cur)?;
                    let len = take_u16(&mut cur)? as usize;
                    let data = take_bytes(&mut cur, len)?;
                    inputs.push(TickInput {
                        client_hash,
                        seq,
                        data,
                    });
                }
                Ok(Self::Tick(TickMessage {
                    frame,
                    snapshot_frame,
                    snapshot_hash,
                    inputs,
                }))
            }
            codes::INITIAL_STATE => {
                let frame = take_u32(&mut cur)?;
                let room_id = take_string(&mut cur)?;
                let snap_len = take_u32(&mut cur)? as usize;
                let snapshot = take_bytes(&mut cur, snap_len)?;
                let frame_count = take_u16(&mut cur)?;
                let mut history = Vec::with_capacity(usize::from(frame_count));
                for _ in 0..frame_count {
                    let f = take_u32(&mut cur)?;
                    let confirmed = take_u8(&mut cur)? != 0;
                    let count = take_u8(&mut cur)?;
                    let mut inputs = Vec::with_capacity(usize::from(count));
                    for _ in 0..count {
                        let client = take_u32(&mut cur)?;
                        let len = take_u16(&mut cur)? as usize;
                        inputs.push((client, take_bytes(&mut cur, len)?));
                    }
                    history.push(HistoryFrame {
                        frame: f,
                        confirmed,
                        inputs,
                    });
                }
                Ok(Self::InitialState(InitialStateMessage {
                    frame,
                    room_id,
                    snapshot,
                    history,
                }))
            }
            codes::ROOM_JOINED => Ok(Self::RoomJoined {
                room_id: take_string(&mut cur)?,
                client_id: take_string(&mut cur)?,
            }),
            codes::ROOM_CREATED => Ok(Self::RoomCreated {
                room_id: take_string(&mut cur)?,
            }),
            codes::ERROR => Ok(Self::Error {
                code: take_u16(&mut cur)?,
                message: take_string(&mut cur)?,
            }),
            codes::SNAPSHOT_UPDATE | codes::BINARY_SNAPSHOT => {
                let frame = take_u32(&mut cur)?;
                let len = take_u32(&mut cur)? as usize;
                let data = take_bytes(&mut cur, len)?;
                if code == codes::SNAPSHOT_UPDATE {
                    Ok(Self::SnapshotUpdate { frame, data })
                } else {
                    Ok(Self::BinarySnapshot { frame, data })
                }
            }
            codes::ROOM_LEFT => Ok(Self::RoomLeft {
                client_id: take_string(&mut cur)?,
            }),
            codes::SYNC_HASH => Ok(Self::SyncHash {
                frame: take_u32(&mut cur)?,
                hash: take_hash(&mut cur)?,
            }),
            codes::CLIENT_LIST_UPDATE => {
                let count = take_u8(&mut cur)?;
                let mut clients = Vec::with_capacity(usize::from(count));
                for _ in 0..count {
                    clients.push(take_string(&mut cur)?);
                }
                Ok(Self::ClientListUpdate { clients })
            }
            codes::BINARY_INPUT => {
                let frame = take_u32(&mut cur)?;
                let client_hash = take_u32(&mut cur)?;
                let seq = take_u32(&mut cur)?;
                let len = take_u16(&mut cur)? as usize;
                let data = take_bytes(&mut cur, len)?;
                Ok(Self::BinaryInput {
                    frame,
                    input: TickInput {
                        client_hash,
                        seq,
                        data,
                    },
                })
            }
            codes::SEND_SNAPSHOT => {
                let seq = take_u32(&mut cur)?;
                let frame = take_u32(&mut cur)?;
                let hash = take_hash(&mut cur)?;
                let len = take_u32(&mut cur)? as usize;
                let data = take_bytes(&mut cur, len)?;
                Ok(Self::SendSnapshot(SendSnapshotMessage {
                    seq,
                    frame,
                    hash,
                    data,
                }))
            }
            other => Err(DecodeError::UnknownMessage(other)),
        }
    }
}

fn put_str(buf: &mut BytesMut, s: &str) {
    let bytes = s.as_bytes();
    let len = bytes.len().min(65535);
    buf.put_u16_le(len as u16);
    buf.put_slice(&bytes[..len]);
}

fn put_hash(buf: &mut BytesMut, hash: &str) {
    let bytes = hash.as_bytes();
    let len = bytes.len().min(255);
    buf.put_u8(len as u8);
    buf.put_slice(&bytes[..len]);
}

fn take_u8(cur: &mut &[u8]) -> Result<u8, DecodeError> {
    if cur.is_empty() {
        return Err(DecodeError::Truncated);
    }
    let v = cur[0];
    *cur = &cur[1..];
    Ok(v)
}

fn take_u16(cur: &mut &[u8]) -> Result<u16, DecodeError> {
    if cur.len() < 2 {
        return Err(DecodeError::Truncated);
    }
    let mut head = &cur[..2];
    *cur = &cur[2..];
    Ok(head.get_u16_le())
}

fn take_u32(cur: &mut &[u8]) -> Result<u32, DecodeError> {
    if cur.len() < 4 {
        return Err(DecodeError::Truncated);
    }
    let mut head = &cur[..4];
    *cur = &cur[4..];
    Ok(head.get_u32_le())
}

fn take_bytes(cur: &mut &[u8], len: usize) -> Result<Bytes, DecodeError> {
    if cur.len() < len {
        return Err(DecodeError::Truncated);
    }
    let out = Bytes::copy_from_slice(&cur[..len]);
    *cur = &cur[len..];
    Ok(out)
}

fn take_string(cur: &mut &[u8]) -> Result<String, DecodeError> {
    let len = take_u16(cur)? as usize;
    if cur.len() < len {
        return Err(DecodeError::Truncated);
    }
    let s = core::str::from_utf8(&cur[..len]).map_err(|_| DecodeError::BadUtf8)?;
    let out = s.to_owned();
    *cur = &cur[len..];
    Ok(out)
}

fn take_hash(cur: &mut &[u8]) -> Result<String, DecodeError> {
    let len = usize::from(take_u8(cur)?);
    if cur.len() < len {
        return Err(DecodeError::Truncated);
    }
    let s = core::str::from_utf8(&cur[..len]).map_err(|_| DecodeError::BadUtf8)?;
    let out = s.to_owned();
    *cur = &cur[len..];
    Ok(out)
}
