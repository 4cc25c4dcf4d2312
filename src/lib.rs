//! # p4calc: P4calc protocol codec and exchange client
//!
//! Client side of a small request/response protocol carried directly in Ethernet
//! frames (EtherType `0x1234`) and answered by a programmable switch data plane.
//!
//! ## Layers
//!
//! - [`codec`]: fixed-width field codecs (fixed strings, byte, 32/64-bit and two
//!   distinct 40-bit integer layouts)
//! - [`schema`]: ordered field lists; schema A (single-stage) and B (two-stage cascade)
//! - [`parser`]: the same schemas written as declarative text (PEST grammar)
//! - [`frame`] / [`dispatch`]: Ethernet II framing and the EtherType binding
//! - [`link`] / [`exchange`]: raw frame transport and the send-one, await-one exchange
//! - [`token`]: combinator tokenizer for `number operator number` expressions
//! - [`capture`]: decode calculator frames out of pcap / pcapng captures
//!
//! ## Wire layout (schema A)
//!
//! ```text
//! "P" "4" version:u8 max_pool_index:u32be data:u40le replication:u32be res:u64be
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use p4calc::{fields, Dispatcher, Exchange, ExchangeConfig, Topology};
//!
//! let config = ExchangeConfig { interface: "veth0".into(), ..Default::default() };
//! let mut ex = Exchange::open(config, Dispatcher::for_topology(Topology::SingleStage))?;
//! let reply = ex.request(&fields([("data", 0x11u64)]))?;
//! println!("res = {:?}", reply.res);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod capture;
pub mod codec;
pub mod dispatch;
pub mod dump;
pub mod exchange;
pub mod frame;
pub mod link;
pub mod parser;
pub mod schema;
pub mod token;
pub mod value;

pub use codec::{CodecError, Endianness, FieldCodec, FixedWidthIntCodec, OverflowPolicy};
pub use dispatch::{Dispatcher, Topology};
pub use exchange::{request, Exchange, ExchangeConfig, ExchangeError, ExchangeState, Reply};
pub use frame::{EtherType, Frame, FrameError, MacAddr, CALC_ETHERTYPE};
pub use link::{Link, LinkError, Loopback};
pub use parser::{parse, parse_schema};
pub use schema::{Field, PacketSchema};
pub use token::{tokenize, Token, TokenKind, TokenizeError};
pub use value::{fields, Fields, Value};
