//! Synchronous request/reply exchange.
//!
//! One request is in flight at a time: encode, send once, then inspect the first frame
//! that arrives within the timeout. There is no retry and no correlation id; pairing a
//! reply with its request relies on the caller never overlapping two exchanges on the
//! same interface. Adding concurrency means adding a request id to the schemas first.

use crate::codec::CodecError;
use crate::dispatch::Dispatcher;
use crate::dump::hexdump;
use crate::frame::{EtherType, Frame, MacAddr};
use crate::link::{Link, LinkError};
use crate::schema::{PacketSchema, RES};
use crate::value::Fields;
use std::time::Duration;

/// Link address the processing element answers on unless configured otherwise.
pub const DEFAULT_PEER: MacAddr = MacAddr([0x00, 0x04, 0x00, 0x00, 0x00, 0x00]);

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Everything an exchange needs to know about where it talks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeConfig {
    pub interface: String,
    pub peer: MacAddr,
    pub source: MacAddr,
    pub timeout: Duration,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        ExchangeConfig {
            interface: "eth0".to_string(),
            peer: DEFAULT_PEER,
            source: MacAddr::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    Sent,
    Completed,
    TimedOut,
    /// A frame arrived but was not a decodable calculator reply.
    Unmatched,
}

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    #[error("reply is not a calculator frame{}", .ethertype.map(|t| format!(" (ethertype {})", t)).unwrap_or_default())]
    NoMatch { ethertype: Option<EtherType> },
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Link(#[from] LinkError),
}

/// Decoded reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// The `res` field, when the schema has one.
    pub res: Option<u64>,
    pub fields: Fields,
    pub frame: Frame,
}

/// Request/reply engine over one link. Not for concurrent use.
#[derive(Debug)]
pub struct Exchange<L> {
    link: L,
    config: ExchangeConfig,
    dispatcher: Dispatcher,
    state: ExchangeState,
}

impl<L: Link> Exchange<L> {
    pub fn new(link: L, config: ExchangeConfig, dispatcher: Dispatcher) -> Self {
        Exchange {
            link,
            config,
            dispatcher,
            state: ExchangeState::Idle,
        }
    }

    /// State reached by the last request.
    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn into_link(self) -> L {
        self.link
    }

    /// Send one request built from `values` (absent fields take defaults) and wait for
    /// the first inbound frame.
    pub fn request(&mut self, values: &Fields) -> Result<Reply, ExchangeError> {
        self.state = ExchangeState::Idle;
        let frame = self
            .dispatcher
            .wrap(self.config.peer, self.config.source, values)?;
        let bytes = frame.to_bytes();
        self.link.send(&bytes)?;
        self.state = ExchangeState::Sent;
        tracing::debug!(
            iface = %self.config.interface,
            dst = %self.config.peer,
            len = bytes.len(),
            "request sent"
        );
        tracing::trace!(frame = %hexdump(&bytes), "tx");

        let raw = match self.link.recv(self.config.timeout)? {
            Some(raw) => raw,
            None => {
                self.state = ExchangeState::TimedOut;
                tracing::debug!(timeout = ?self.config.timeout, "no reply");
                return Err(ExchangeError::Timeout(self.config.timeout));
            }
        };
        tracing::trace!(frame = %hexdump(&raw), "rx");

        let reply = match Frame::parse(&raw) {
            Ok(f) => f,
            Err(e) => {
                self.state = ExchangeState::Unmatched;
                tracing::warn!(error = %e, "unparseable reply");
                return Err(ExchangeError::NoMatch { ethertype: None });
            }
        };
        tracing::debug!(src = %reply.src, ethertype = %reply.ethertype, len = raw.len(), "reply received");

        let fields = match self.dispatcher.decode(&reply) {
            Ok(Some(fields)) => fields,
            Ok(None) => {
                self.state = ExchangeState::Unmatched;
                tracing::warn!(ethertype = %reply.ethertype, "reply with foreign ethertype");
                return Err(ExchangeError::NoMatch {
                    ethertype: Some(reply.ethertype),
                });
            }
            Err(e) => {
                self.state = ExchangeState::Unmatched;
                return Err(e.into());
            }
        };

        self.state = ExchangeState::Completed;
        Ok(Reply {
            res: fields.get(RES).and_then(|v| v.as_u64()),
            fields,
            frame: reply,
        })
    }
}

#[cfg(target_os = "linux")]
impl Exchange<crate::link::RawSocket> {
    /// Open a raw socket on `config.interface`. A zero `config.source` is replaced by
    /// the interface's own link address.
    pub fn open(mut config: ExchangeConfig, dispatcher: Dispatcher) -> Result<Self, LinkError> {
        let link = crate::link::RawSocket::open(&config.interface)?;
        if config.source == MacAddr::default() {
            config.source = link.hardware_addr()?;
        }
        Ok(Self::new(link, config, dispatcher))
    }
}

/// One-shot exchange: send `values` encoded with `schema` over `link` and await the reply.
pub fn request<L: Link>(
    link: &mut L,
    schema: &PacketSchema,
    values: &Fields,
    config: &ExchangeConfig,
) -> Result<Reply, ExchangeError> {
    Exchange::new(link, config.clone(), Dispatcher::new(schema.clone())).request(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Topology;
    use crate::frame::CALC_ETHERTYPE;
    use crate::link::Loopback;
    use crate::value::{fields, Value};

    fn exchange(link: Loopback) -> Exchange<Loopback> {
        Exchange::new(
            link,
            ExchangeConfig::default(),
            Dispatcher::for_topology(Topology::SingleStage),
        )
    }

    #[test]
    fn default_config() {
        let c = ExchangeConfig::default();
        assert_eq!(c.interface, "eth0");
        assert_eq!(c.peer.to_string(), "00:04:00:00:00:00");
        assert_eq!(c.timeout, Duration::from_secs(1));
    }

    #[test]
    fn silent_peer_times_out() {
        let mut ex = exchange(Loopback::new());
        assert_eq!(ex.state(), ExchangeState::Idle);
        let err = ex.request(&Fields::new()).unwrap_err();
        assert!(matches!(err, ExchangeError::Timeout(d) if d == DEFAULT_TIMEOUT));
        assert_eq!(ex.state(), ExchangeState::TimedOut);
        assert_eq!(ex.link().sent().len(), 1);
    }

    #[test]
    fn request_frame_is_addressed_to_peer() {
        let mut ex = exchange(Loopback::new());
        let _ = ex.request(&fields([("data", 0x11u64)]));
        let sent = Frame::parse(&ex.link().sent()[0]).unwrap();
        assert_eq!(sent.dst, DEFAULT_PEER);
        assert_eq!(sent.ethertype, CALC_ETHERTYPE);
        assert_eq!(&sent.payload[..3], b"P4\x01");
    }

    #[test]
    fn echo_completes_with_res() {
        let mut ex = exchange(Loopback::echo());
        let mut values = fields([("data", 0x11u64), ("res", 0x2au64)]);
        values.insert("max_pool_index".into(), Value::U32(0x0e));
        let reply = ex.request(&values).unwrap();
        assert_eq!(ex.state(), ExchangeState::Completed);
        assert_eq!(reply.res, Some(0x2a));
        assert_eq!(reply.fields.get("max_pool_index"), Some(&Value::U32(0x0e)));
    }

    #[test]
    fn foreign_ethertype_is_no_match_without_waiting_further() {
        let mut link = Loopback::new();
        let mut other = Frame::parse(&[0u8; 60]).unwrap();
        other.ethertype = EtherType(0x0800);
        link.push_reply(other.to_bytes());
        let good = Dispatcher::for_topology(Topology::SingleStage)
            .wrap(MacAddr::default(), DEFAULT_PEER, &Fields::new())
            .unwrap();
        link.push_reply(good.to_bytes());

        let mut ex = exchange(link);
        let err = ex.request(&Fields::new()).unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::NoMatch {
                ethertype: Some(EtherType(0x0800))
            }
        ));
        assert_eq!(ex.state(), ExchangeState::Unmatched);
        assert_eq!(ex.link().pending_replies(), 1);
    }

    #[test]
    fn runt_reply_is_no_match() {
        let mut link = Loopback::new();
        link.push_reply(vec![0; 5]);
        let err = exchange(link).request(&Fields::new()).unwrap_err();
        assert!(matches!(err, ExchangeError::NoMatch { ethertype: None }));
        assert_eq!(err.to_string(), "reply is not a calculator frame");
    }

    #[derive(Clone, Default)]
    struct LogBuf(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn trace_level_dumps_both_directions() {
        let buf = LogBuf::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            exchange(Loopback::echo()).request(&Fields::new()).unwrap();
        });
        let out = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("tx"), "{}", out);
        assert!(out.contains("rx"), "{}", out);
        assert_eq!(out.matches("12 34 50 34 01").count(), 2, "{}", out);
    }

    #[test]
    fn encode_failure_sends_nothing() {
        let mut ex = exchange(Loopback::echo());
        let err = ex.request(&fields([("data", 1u64 << 40)])).unwrap_err();
        assert!(matches!(err, ExchangeError::Codec(CodecError::Range { .. })));
        assert!(ex.link().sent().is_empty());
        assert_eq!(ex.state(), ExchangeState::Idle);
    }

    #[test]
    fn one_shot_request() {
        let mut link = Loopback::echo();
        let schema = PacketSchema::cascade();
        let reply = request(
            &mut link,
            &schema,
            &fields([("res", 99u64)]),
            &ExchangeConfig::default(),
        )
        .unwrap();
        assert_eq!(reply.res, Some(99));
        assert_eq!(link.sent().len(), 1);
    }
}
