//! Per-command convenience surface.
//!
//! Thin formatters over [`Client::send_command`]: each method frames the
//! right keyword and hands the reply to the given callback. Keys, members
//! and payloads are raw bytes; Redis itself treats them as binary.

use crate::client::Client;
use crate::value::Value;

impl Client {
    pub fn auth<F>(&self, password: &[u8], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_command(&[b"AUTH", password], on_reply);
    }

    pub fn ping<F>(&self, on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_command(&[b"PING"], on_reply);
    }

    pub fn get<F>(&self, key: &[u8], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_command(&[b"GET", key], on_reply);
    }

    pub fn set<F>(&self, key: &[u8], value: &[u8], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_command(&[b"SET", key, value], on_reply);
    }

    pub fn del<F>(&self, key: &[u8], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_command(&[b"DEL", key], on_reply);
    }

    pub fn hset<F>(&self, key: &[u8], field: &[u8], value: &[u8], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_command(&[b"HSET", key, field, value], on_reply);
    }

    pub fn hget<F>(&self, key: &[u8], field: &[u8], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_command(&[b"HGET", key, field], on_reply);
    }

    pub fn hdel<F>(&self, key: &[u8], field: &[u8], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_command(&[b"HDEL", key, field], on_reply);
    }

    pub fn sadd<F>(&self, key: &[u8], members: &[&[u8]], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_keyed(b"SADD", key, members, on_reply);
    }

    pub fn scard<F>(&self, key: &[u8], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_command(&[b"SCARD", key], on_reply);
    }

    pub fn sdiff<F>(&self, key: &[u8], keys: &[&[u8]], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_keyed(b"SDIFF", key, keys, on_reply);
    }

    pub fn sdiffstore<F>(&self, destination: &[u8], key: &[u8], keys: &[&[u8]], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_store(b"SDIFFSTORE", destination, key, keys, on_reply);
    }

    pub fn sinter<F>(&self, key: &[u8], keys: &[&[u8]], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_keyed(b"SINTER", key, keys, on_reply);
    }

    pub fn sinterstore<F>(&self, destination: &[u8], key: &[u8], keys: &[&[u8]], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_store(b"SINTERSTORE", destination, key, keys, on_reply);
    }

    pub fn sismember<F>(&self, key: &[u8], member: &[u8], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_command(&[b"SISMEMBER", key, member], on_reply);
    }

    pub fn smembers<F>(&self, key: &[u8], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_command(&[b"SMEMBERS", key], on_reply);
    }

    pub fn smove<F>(&self, source: &[u8], destination: &[u8], member: &[u8], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_command(&[b"SMOVE", source, destination, member], on_reply);
    }

    pub fn spop<F>(&self, key: &[u8], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_command(&[b"SPOP", key], on_reply);
    }

    pub fn srandmember<F>(&self, key: &[u8], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_command(&[b"SRANDMEMBER", key], on_reply);
    }

    pub fn srandmember_count<F>(&self, key: &[u8], count: i64, on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        let count = count.to_string();
        self.send_command(&[b"SRANDMEMBER", key, count.as_bytes()], on_reply);
    }

    pub fn srem<F>(&self, key: &[u8], members: &[&[u8]], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_keyed(b"SREM", key, members, on_reply);
    }

    pub fn sunion<F>(&self, key: &[u8], keys: &[&[u8]], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_keyed(b"SUNION", key, keys, on_reply);
    }

    pub fn sunionstore<F>(&self, destination: &[u8], key: &[u8], keys: &[&[u8]], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_store(b"SUNIONSTORE", destination, key, keys, on_reply);
    }

    pub fn sscan<F>(&self, key: &[u8], cursor: u64, pattern: &[u8], count: u64, on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        let cursor = cursor.to_string();
        let count = count.to_string();
        self.send_command(
            &[
                b"SSCAN",
                key,
                cursor.as_bytes(),
                b"MATCH",
                pattern,
                b"COUNT",
                count.as_bytes(),
            ],
            on_reply,
        );
    }

    pub fn publish<F>(&self, channel: &[u8], message: &[u8], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_command(&[b"PUBLISH", channel, message], on_reply);
    }

    /// Subscribe to `channel`; see [`Client::send_subscribe`] for what the
    /// handler receives.
    pub fn subscribe<F>(&self, channel: &[u8], on_message: F)
    where
        F: FnMut(Value) + Send + 'static,
    {
        self.send_subscribe(channel, on_message);
    }

    /// Unsubscribe from `channel`. The channel's push handler is dropped
    /// when the server's acknowledgement comes back.
    pub fn unsubscribe<F>(&self, channel: &[u8], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.send_command(&[b"UNSUBSCRIBE", channel], on_reply);
    }

    /// `<keyword> <key> <extra...>` for the variadic set commands.
    fn send_keyed<F>(&self, keyword: &[u8], key: &[u8], extra: &[&[u8]], on_reply: F)
    where
        F: FnOnce(Value) + Send + 'static,
    {
        let mut args: Vec<&[u8]> = Vec::with_capacity(extra.len() + 2);
        args.push(keyword);
        args.push(key);
        args.extend_from_slice(extra);
        self.send_command(&args, on_reply);
    }

    /// `<keyword> <destination> <key> <extra...>` for the STORE variants.
    fn send_store<F>(
        &self,
        keyword: &[u8],
        destination: &[u8],
        key: &[u8],
        extra: &[&[u8]],
        on_reply: F,
    ) where
        F: FnOnce(Value) + Send + 'static,
    {
        let mut args: Vec<&[u8]> = Vec::with_capacity(extra.len() + 3);
        args.push(keyword);
        args.push(destination);
        args.push(key);
        args.extend_from_slice(extra);
        self.send_command(&args, on_reply);
    }
}
