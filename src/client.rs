//! Request/response correlation over a byte transport.
//!
//! The client owns no socket. Outbound frames go through a caller-supplied
//! sink callback; inbound bytes arrive via [`Client::feed`]. Replies are
//! matched to commands strictly FIFO, the way a Redis connection pipelines
//! them, while pub/sub push frames are routed by channel name instead of
//! queue position.
//!
//! Locking is split by direction: one mutex guards the sink, the pending
//! queue and the subscription map (the write side), another guards the
//! parser (the read side). The two sides may run on different threads;
//! dispatch briefly takes the write lock to pop a handler and releases it
//! before the handler runs.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::BytesMut;
use tracing::{trace, warn};

use crate::parser::{ParseStatus, Parser};
use crate::value::Value;

/// Message of the synthesized reply delivered when inbound framing breaks.
const PARSE_ERROR_MESSAGE: &str = "redis parse error";

/// One-shot handler for a single command reply.
pub type ReplyHandler = Box<dyn FnOnce(Value) + Send + 'static>;

/// Handler for the push traffic of one subscribed channel. Shared so
/// dispatch can invoke it without holding the client's own locks.
type SubscriptionHandler = Arc<Mutex<dyn FnMut(Value) + Send + 'static>>;

struct WriteSide {
    sink: Box<dyn FnMut(&[u8]) + Send + 'static>,
    pending: VecDeque<ReplyHandler>,
    subscriptions: HashMap<Vec<u8>, SubscriptionHandler>,
}

struct ReadSide {
    parser: Parser,
    poisoned: bool,
}

/// A pipelined RESP client over a caller-supplied byte transport.
pub struct Client {
    write: Mutex<WriteSide>,
    read: Mutex<ReadSide>,
}

impl Client {
    /// Create a client that frames commands into `sink`.
    ///
    /// The sink is called synchronously from `send_command`, under the
    /// client's write lock, with one complete request frame per call.
    pub fn new<W>(sink: W) -> Client
    where
        W: FnMut(&[u8]) + Send + 'static,
    {
        Client {
            write: Mutex::new(WriteSide {
                sink: Box::new(sink),
                pending: VecDeque::new(),
                subscriptions: HashMap::new(),
            }),
            read: Mutex::new(ReadSide {
                parser: Parser::new(),
                poisoned: false,
            }),
        }
    }

    /// Send a command and register `on_reply` for its response.
    ///
    /// `args` become a RESP array of bulk strings, bytes copied verbatim.
    pub fn send_command<F>(&self, args: &[&[u8]], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_raw(args, Box::new(on_reply), None);
    }

    /// Send `SUBSCRIBE channel` and register `on_message` for its traffic.
    ///
    /// The handler first receives the server's `subscribe` acknowledgement
    /// array, then the payload of every `message` push for the channel. It
    /// stays registered until an `unsubscribe` acknowledgement for the
    /// channel is observed.
    pub fn send_subscribe<F>(&self, channel: &[u8], on_message: F)
    where
        F: FnMut(Value) + Send + 'static,
    {
        let handler: SubscriptionHandler = Arc::new(Mutex::new(on_message));
        let ack = Arc::clone(&handler);
        self.send_raw(
            &[b"SUBSCRIBE", channel],
            Box::new(move |value| {
                let mut f = ack.lock().unwrap_or_else(|e| e.into_inner());
                (&mut *f)(value);
            }),
            Some((channel.to_vec(), handler)),
        );
    }

    fn send_raw(
        &self,
        args: &[&[u8]],
        on_reply: ReplyHandler,
        subscription: Option<(Vec<u8>, SubscriptionHandler)>,
    ) {
        let mut frame = BytesMut::new();
        encode_command(args, &mut frame);

        let mut side = self.lock_write();
        if let Some((channel, handler)) = subscription {
            side.subscriptions.insert(channel, handler);
        }
        // The handler must be queued before the bytes can reach the wire,
        // or a fast reply could race the registration.
        side.pending.push_back(on_reply);
        trace!(frame_len = frame.len(), "command framed");
        (side.sink)(&frame);
    }

    /// Feed inbound transport bytes, dispatching every completed reply.
    ///
    /// Returns the number of bytes consumed. Anything short of the input
    /// length means a partial frame is buffered in the parser; pass the
    /// next read starting where this one left off, or simply pass fresh
    /// socket reads. The parser holds its own state.
    ///
    /// On malformed input the pending head receives a synthesized
    /// `Error("redis parse error")`, the rest of the buffer is discarded,
    /// and the client is poisoned; the connection should be closed.
    pub fn feed(&self, input: &[u8]) -> usize {
        let mut read = self.lock_read();
        if read.poisoned {
            warn!(dropped = input.len(), "feed on poisoned client discarded");
            return input.len();
        }

        let mut pos = 0;
        while pos < input.len() {
            let (consumed, status) = read.parser.feed(&input[pos..]);
            pos += consumed;
            match status {
                ParseStatus::Incomplete => break,
                ParseStatus::Complete => {
                    if let Some(value) = read.parser.take_result() {
                        trace!(kind = ?value.kind(), "reply frame decoded");
                        self.dispatch(value);
                    }
                }
                ParseStatus::Malformed => {
                    warn!(at = pos, "malformed reply frame; poisoning connection");
                    read.poisoned = true;
                    self.deliver_reply(Value::error(PARSE_ERROR_MESSAGE));
                    return input.len();
                }
            }
        }
        pos
    }

    /// Drain every pending reply handler with a synthesized error.
    ///
    /// For the surrounding shell to call once the transport is gone and no
    /// further replies can arrive.
    pub fn fail_pending(&self, message: &str) {
        let drained: Vec<ReplyHandler> = {
            let mut side = self.lock_write();
            side.pending.drain(..).collect()
        };
        for handler in drained {
            handler(Value::error(message));
        }
    }

    /// Whether malformed inbound data has permanently stopped this client.
    pub fn is_poisoned(&self) -> bool {
        self.lock_read().poisoned
    }

    /// Route one completed reply to its handler.
    fn dispatch(&self, value: Value) {
        match classify(&value) {
            Route::Push { channel } => {
                let handler = self.lock_write().subscriptions.get(&channel).cloned();
                match handler {
                    Some(handler) => {
                        let payload = match value {
                            Value::Array(mut items) => items.pop().unwrap_or(Value::Null),
                            _ => Value::Null,
                        };
                        trace!(
                            channel = %String::from_utf8_lossy(&channel),
                            "pub/sub message"
                        );
                        let mut f = handler.lock().unwrap_or_else(|e| e.into_inner());
                        (&mut *f)(payload);
                    }
                    None => warn!(
                        channel = %String::from_utf8_lossy(&channel),
                        "pub/sub message for unknown channel dropped"
                    ),
                }
            }
            Route::Ack { unsubscribed } => {
                let handler = {
                    let mut side = self.lock_write();
                    if let Some(channel) = unsubscribed {
                        side.subscriptions.remove(&channel);
                    }
                    side.pending.pop_front()
                };
                match handler {
                    Some(handler) => handler(value),
                    None => warn!("subscription ack with no pending handler"),
                }
            }
            Route::Reply => self.deliver_reply(value),
        }
    }

    fn deliver_reply(&self, value: Value) {
        let handler = self.lock_write().pending.pop_front();
        match handler {
            Some(handler) => handler(value),
            None => warn!(kind = ?value.kind(), "reply with no pending handler dropped"),
        }
    }

    fn lock_write(&self) -> MutexGuard<'_, WriteSide> {
        // A panicking sink poisons the lock; the queues are still
        // consistent, so keep going.
        self.write.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_read(&self) -> MutexGuard<'_, ReadSide> {
        self.read.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Where a completed reply should be delivered.
enum Route {
    /// `message` push frame for a subscribed channel.
    Push { channel: Vec<u8> },
    /// `subscribe`/`unsubscribe` acknowledgement; consumes a pending entry.
    Ack { unsubscribed: Option<Vec<u8>> },
    /// Plain command reply; consumes a pending entry.
    Reply,
}

fn classify(value: &Value) -> Route {
    let items = match value {
        Value::Array(items) => items,
        _ => return Route::Reply,
    };
    let head = match items.first().and_then(text_of) {
        Some(head) => head,
        None => return Route::Reply,
    };
    if head == b"message" {
        // A well-formed push is exactly [message, channel, payload];
        // anything else falls through and consumes a pending handler.
        if items.len() == 3 {
            if let Some(channel) = text_of(&items[1]) {
                return Route::Push {
                    channel: channel.to_vec(),
                };
            }
        }
        return Route::Reply;
    }
    if head == b"subscribe" {
        return Route::Ack { unsubscribed: None };
    }
    if head == b"unsubscribe" {
        return Route::Ack {
            unsubscribed: items.get(1).and_then(text_of).map(|c| c.to_vec()),
        };
    }
    Route::Reply
}

/// The text of a `Status` or `Bulk` element; push and ack discriminators
/// may arrive in either form.
fn text_of(value: &Value) -> Option<&[u8]> {
    match value {
        Value::Status(s) => Some(s.as_bytes()),
        Value::Bulk(data) => Some(data),
        _ => None,
    }
}

/// Serialize a command as a RESP array of bulk strings.
fn encode_command(args: &[&[u8]], buf: &mut BytesMut) {
    buf.extend_from_slice(b"*");
    buf.extend_from_slice(args.len().to_string().as_bytes());
    buf.extend_from_slice(b"\r\n");
    for arg in args {
        buf.extend_from_slice(b"$");
        buf.extend_from_slice(arg.len().to_string().as_bytes());
        buf.extend_from_slice(b"\r\n");
        buf.extend_from_slice(arg);
        buf.extend_from_slice(b"\r\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Client whose sink records every framed request.
    fn recording_client() -> (Client, Arc<Mutex<Vec<u8>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let sink_buf = Arc::clone(&written);
        let client = Client::new(move |bytes: &[u8]| {
            sink_buf.lock().unwrap().extend_from_slice(bytes);
        });
        (client, written)
    }

    /// Shared vector collecting dispatched values.
    fn collector() -> (Arc<Mutex<Vec<Value>>>, impl Fn() -> ReplyHandler) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let make = {
            let seen = Arc::clone(&seen);
            move || -> ReplyHandler {
                let seen = Arc::clone(&seen);
                Box::new(move |value| seen.lock().unwrap().push(value))
            }
        };
        (seen, make)
    }

    #[test]
    fn test_command_framing() {
        let (client, written) = recording_client();
        client.send_command(&[b"GET", b"abc"], |_| {});
        assert_eq!(
            written.lock().unwrap().as_slice(),
            b"*2\r\n$3\r\nGET\r\n$3\r\nabc\r\n"
        );
    }

    #[test]
    fn test_command_framing_is_binary_safe() {
        let (client, written) = recording_client();
        client.send_command(&[b"SET", b"k\r\nk", b"\x00\xff"], |_| {});
        assert_eq!(
            written.lock().unwrap().as_slice(),
            b"*3\r\n$3\r\nSET\r\n$4\r\nk\r\nk\r\n$2\r\n\x00\xff\r\n"
        );
    }

    #[test]
    fn test_empty_argument_frames_as_empty_bulk() {
        let (client, written) = recording_client();
        client.send_command(&[b"ECHO", b""], |_| {});
        assert_eq!(
            written.lock().unwrap().as_slice(),
            b"*2\r\n$4\r\nECHO\r\n$0\r\n\r\n"
        );
    }

    #[test]
    fn test_fifo_correlation() {
        let (client, _) = recording_client();
        let (seen, handler) = collector();

        client.send_command(&[b"PING"], handler());
        client.send_command(&[b"GET", b"a"], handler());
        client.send_command(&[b"GET", b"b"], handler());

        let consumed = client.feed(b"+one\r\n:2\r\n$5\r\nthree\r\n");
        assert_eq!(consumed, 21);
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[
                Value::status("one"),
                Value::integer(2),
                Value::bulk(&b"three"[..]),
            ]
        );
    }

    #[test]
    fn test_feed_buffers_partial_frames() {
        let (client, _) = recording_client();
        let (seen, handler) = collector();
        client.send_command(&[b"PING"], handler());

        assert_eq!(client.feed(b"+PO"), 3);
        assert!(seen.lock().unwrap().is_empty());

        assert_eq!(client.feed(b"NG\r\n"), 4);
        assert_eq!(seen.lock().unwrap().as_slice(), &[Value::status("PONG")]);
    }

    #[test]
    fn test_pubsub_isolation() {
        let (client, written) = recording_client();
        let pushed = Arc::new(Mutex::new(Vec::new()));
        let push_log = Arc::clone(&pushed);
        client.send_subscribe(b"ch1", move |value| {
            push_log.lock().unwrap().push(value);
        });
        assert_eq!(
            written.lock().unwrap().as_slice(),
            b"*2\r\n$9\r\nSUBSCRIBE\r\n$3\r\nch1\r\n"
        );

        // Acknowledgement consumes the one-shot pending entry and reaches
        // the subscription handler.
        client.feed(b"*3\r\n$9\r\nsubscribe\r\n$3\r\nch1\r\n:1\r\n");
        assert_eq!(pushed.lock().unwrap().len(), 1);
        assert_eq!(pushed.lock().unwrap()[0].as_array().len(), 3);

        // A command pipelined behind the subscription.
        let (seen, handler) = collector();
        client.send_command(&[b"GET", b"k"], handler());

        // Push frames bypass the pending queue entirely.
        client.feed(b"*3\r\n$7\r\nmessage\r\n$3\r\nch1\r\n$5\r\nhello\r\n");
        assert_eq!(pushed.lock().unwrap().len(), 2);
        assert_eq!(pushed.lock().unwrap()[1], Value::bulk(&b"hello"[..]));
        assert!(seen.lock().unwrap().is_empty());

        // The pending handler still gets the next plain reply.
        client.feed(b"$3\r\nval\r\n");
        assert_eq!(seen.lock().unwrap().as_slice(), &[Value::bulk(&b"val"[..])]);
    }

    #[test]
    fn test_unsubscribe_removes_subscription() {
        let (client, _) = recording_client();
        let pushed = Arc::new(Mutex::new(Vec::new()));
        let push_log = Arc::clone(&pushed);
        client.send_subscribe(b"ch1", move |value| {
            push_log.lock().unwrap().push(value);
        });
        client.feed(b"*3\r\n$9\r\nsubscribe\r\n$3\r\nch1\r\n:1\r\n");

        let (acks, handler) = collector();
        client.send_command(&[b"UNSUBSCRIBE", b"ch1"], handler());
        client.feed(b"*3\r\n$11\r\nunsubscribe\r\n$3\r\nch1\r\n:0\r\n");
        assert_eq!(acks.lock().unwrap().len(), 1);

        // A straggling push for the dropped channel goes nowhere.
        let before = pushed.lock().unwrap().len();
        client.feed(b"*3\r\n$7\r\nmessage\r\n$3\r\nch1\r\n$4\r\nlate\r\n");
        assert_eq!(pushed.lock().unwrap().len(), before);
    }

    #[test]
    fn test_push_for_unknown_channel_is_dropped() {
        let (client, _) = recording_client();
        let (seen, handler) = collector();
        client.send_command(&[b"GET", b"k"], handler());

        client.feed(b"*3\r\n$7\r\nmessage\r\n$5\r\nother\r\n$2\r\nhi\r\n");
        assert!(seen.lock().unwrap().is_empty());

        client.feed(b"+OK\r\n");
        assert_eq!(seen.lock().unwrap().as_slice(), &[Value::status("OK")]);
    }

    #[test]
    fn test_push_with_wrong_arity_is_a_plain_reply() {
        let (client, _) = recording_client();
        let (seen, handler) = collector();
        client.send_command(&[b"SMEMBERS", b"k"], handler());

        // Two-element "message" array is not a push; it consumes the
        // pending handler like any other reply.
        client.feed(b"*2\r\n$7\r\nmessage\r\n$3\r\nch1\r\n");
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].as_array().len(), 2);
    }

    #[test]
    fn test_malformed_input_poisons_client() {
        let (client, _) = recording_client();
        let (seen, handler) = collector();
        client.send_command(&[b"PING"], handler());
        client.send_command(&[b"PING"], handler());

        // First reply is fine, then the framing breaks: the next pending
        // handler gets the synthesized error and the rest is discarded.
        let input: &[u8] = b"+OK\r\n:zz\r\nleftover";
        assert_eq!(client.feed(input), input.len());
        assert!(client.is_poisoned());
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[Value::status("OK"), Value::error("redis parse error")]
        );

        // Poisoned clients swallow further input without dispatching.
        assert_eq!(client.feed(b"+PONG\r\n"), 7);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_reply_with_no_pending_handler_is_dropped() {
        let (client, _) = recording_client();
        // Must not panic or poison anything.
        assert_eq!(client.feed(b"+OK\r\n"), 5);
        assert!(!client.is_poisoned());
    }

    #[test]
    fn test_fail_pending_drains_all_handlers() {
        let (client, _) = recording_client();
        let (seen, handler) = collector();
        client.send_command(&[b"GET", b"a"], handler());
        client.send_command(&[b"GET", b"b"], handler());

        client.fail_pending("connection lost");
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[
                Value::error("connection lost"),
                Value::error("connection lost"),
            ]
        );

        // The queue is empty afterwards; replies no longer reach anyone.
        client.feed(b"+OK\r\n");
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_handler_may_send_followup_commands() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let sink_buf = Arc::clone(&written);
        let client = Arc::new(Client::new(move |bytes: &[u8]| {
            sink_buf.lock().unwrap().extend_from_slice(bytes);
        }));

        let (seen, handler) = collector();
        let chained = Arc::clone(&client);
        let chained_handler = handler();
        client.send_command(&[b"GET", b"a"], move |_| {
            chained.send_command(&[b"GET", b"b"], chained_handler);
        });

        written.lock().unwrap().clear();
        client.feed(b"$1\r\na\r\n");
        assert_eq!(
            written.lock().unwrap().as_slice(),
            b"*2\r\n$3\r\nGET\r\n$1\r\nb\r\n"
        );

        client.feed(b"$1\r\nb\r\n");
        assert_eq!(seen.lock().unwrap().as_slice(), &[Value::bulk(&b"b"[..])]);
    }
}
