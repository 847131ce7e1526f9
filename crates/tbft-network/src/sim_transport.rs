//! A deterministic, seedable stand-in for a real peer-to-peer network:
//! delayed, dropped, duplicated, reordered, and rate-limited delivery.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tbft_primitives::Address;

use crate::error::{NetworkError, NetworkResult};
use crate::message::NetMessage;
use crate::transport::Transport;

/// Tunables for [`SimTransport`]. Defaults mirror a lossy, moderately
/// congested wide-area network.
#[derive(Debug, Clone, PartialEq)]
pub struct SimTransportConfig {
    /// Minimum and maximum simulated one-way delay, in simulated seconds.
    pub delay_range: (f64, f64),
    /// Probability a sent message is dropped outright.
    pub loss_rate: f64,
    /// Probability a sent message is additionally duplicated.
    pub duplicate_rate: f64,
    /// When false, every delivered message has zero delay.
    pub enable_delays: bool,
    /// Sends per rolling one-second window before a sender is rate-limited.
    pub max_sends_per_second: u32,
    /// How long, in simulated seconds, a rate-limited sender stays blocked.
    pub block_duration: f64,
}

impl Default for SimTransportConfig {
    fn default() -> Self {
        Self {
            delay_range: (0.01, 0.1),
            loss_rate: 0.1,
            duplicate_rate: 0.05,
            enable_delays: true,
            max_sends_per_second: 100,
            block_duration: 5.0,
        }
    }
}

impl SimTransportConfig {
    fn validate(&self) -> NetworkResult<()> {
        if !(0.0..=1.0).contains(&self.loss_rate) {
            return Err(NetworkError::InvalidLossRate(self.loss_rate));
        }
        if !(0.0..=1.0).contains(&self.duplicate_rate) {
            return Err(NetworkError::InvalidDuplicateRate(self.duplicate_rate));
        }
        if self.delay_range.0 > self.delay_range.1 {
            return Err(NetworkError::InvalidDelayRange(self.delay_range.0, self.delay_range.1));
        }
        Ok(())
    }
}

/// Point-in-time counters describing what a [`SimTransport`] has done so
/// far. `rate_limited_drops` and `rate_limit_drops` carry the same value
/// under two names for compatibility with callers written against either
/// spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkStats {
    /// Messages that reached a receiver's inbox.
    pub delivered: u64,
    /// Messages dropped, for any reason (loss, rate limit).
    pub dropped: u64,
    /// Messages sent an extra time due to simulated duplication.
    pub duplicated: u64,
    /// Messages in flight, not yet due for delivery.
    pub pending: usize,
    /// Messages sitting in inboxes, not yet collected by `get_messages`.
    pub in_inboxes: usize,
    /// Current simulated time.
    pub simulation_time_millis: u64,
    /// Senders currently blocked by the rate limiter.
    pub blocked_peers: usize,
    /// Canonical name for messages dropped due to rate limiting.
    pub rate_limited_drops: u64,
    /// Legacy name for the same counter.
    pub rate_limit_drops: u64,
}

struct QueuedMessage {
    receiver: Address,
    message: NetMessage,
    delivery_time: f64,
}

/// A simulated unreliable transport. Time only advances when [`Self::tick`]
/// is called; nothing here touches the wall clock or spawns threads.
pub struct SimTransport {
    config: SimTransportConfig,
    rng: StdRng,
    simulation_time: f64,
    queue: Vec<QueuedMessage>,
    inboxes: HashMap<Address, Vec<NetMessage>>,
    delivered_count: u64,
    dropped_count: u64,
    duplicated_count: u64,
    rate_limited_drops: u64,
    send_rate_limit: HashMap<Address, (u32, f64)>,
    blocked_peers: HashSet<Address>,
    peer_block_until: HashMap<Address, f64>,
}

impl SimTransport {
    /// Build a transport with default tunables and a given RNG seed.
    /// Defaults are always valid, so this cannot fail.
    pub fn new(seed: u64) -> Self {
        Self::with_config(SimTransportConfig::default(), seed).expect("default config is valid")
    }

    /// Build a transport with custom tunables and a given RNG seed.
    pub fn with_config(config: SimTransportConfig, seed: u64) -> NetworkResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            simulation_time: 0.0,
            queue: Vec::new(),
            inboxes: HashMap::new(),
            delivered_count: 0,
            dropped_count: 0,
            duplicated_count: 0,
            rate_limited_drops: 0,
            send_rate_limit: HashMap::new(),
            blocked_peers: HashSet::new(),
            peer_block_until: HashMap::new(),
        })
    }

    fn check_rate_limit(&mut self, sender: Address) -> bool {
        let now = self.simulation_time;
        if let Some(&until) = self.peer_block_until.get(&sender) {
            if now < until {
                self.rate_limited_drops += 1;
                return false;
            }
            self.peer_block_until.remove(&sender);
            self.blocked_peers.remove(&sender);
        }

        match self.send_rate_limit.get(&sender).copied() {
            None => {
                self.send_rate_limit.insert(sender, (1, now));
                true
            }
            Some((_, window_start)) if now - window_start > 1.0 => {
                self.send_rate_limit.insert(sender, (1, now));
                true
            }
            Some((count, _)) if count >= self.config.max_sends_per_second => {
                self.blocked_peers.insert(sender);
                self.peer_block_until.insert(sender, now + self.config.block_duration);
                self.rate_limited_drops += 1;
                false
            }
            Some((count, window_start)) => {
                self.send_rate_limit.insert(sender, (count + 1, window_start));
                true
            }
        }
    }

    fn enqueue(&mut self, sender: Address, receiver: Address, message: NetMessage) {
        if !self.check_rate_limit(sender) {
            self.dropped_count += 1;
            return;
        }
        if self.rng.gen::<f64>() < self.config.loss_rate {
            self.dropped_count += 1;
            tracing::trace!(%receiver, "message dropped by simulated loss");
            return;
        }

        let send_time = self.simulation_time;
        let delay = self.sample_delay();
        self.queue.push(QueuedMessage { receiver, message: message.clone(), delivery_time: send_time + delay });

        if self.rng.gen::<f64>() < self.config.duplicate_rate {
            let dup_delay = self.sample_delay();
            self.queue.push(QueuedMessage { receiver, message, delivery_time: send_time + dup_delay });
            self.duplicated_count += 1;
        }
    }

    fn sample_delay(&mut self) -> f64 {
        if !self.config.enable_delays {
            return 0.0;
        }
        let (lo, hi) = self.config.delay_range;
        if lo >= hi {
            lo
        } else {
            self.rng.gen_range(lo..hi)
        }
    }

    /// Advance simulated time by `delta_time` seconds, moving any message
    /// whose delivery time has arrived into its receiver's inbox, then
    /// shuffling every inbox so messages may surface out of send order.
    pub fn tick(&mut self, delta_time: f64) {
        self.simulation_time += delta_time;
        let now = self.simulation_time;

        let (ready, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.queue).into_iter().partition(|m| m.delivery_time <= now);
        for msg in ready {
            self.inboxes.entry(msg.receiver).or_default().push(msg.message);
            self.delivered_count += 1;
        }
        self.queue = pending;

        for inbox in self.inboxes.values_mut() {
            inbox.shuffle(&mut self.rng);
        }
    }

    /// Current simulated time, in seconds since this transport was built.
    pub fn simulation_time(&self) -> f64 {
        self.simulation_time
    }

    /// A snapshot of delivery/loss/rate-limit counters.
    pub fn stats(&self) -> NetworkStats {
        let in_inboxes = self.inboxes.values().map(Vec::len).sum();
        NetworkStats {
            delivered: self.delivered_count,
            dropped: self.dropped_count,
            duplicated: self.duplicated_count,
            pending: self.queue.len(),
            in_inboxes,
            simulation_time_millis: (self.simulation_time * 1000.0) as u64,
            blocked_peers: self.blocked_peers.len(),
            rate_limited_drops: self.rate_limited_drops,
            rate_limit_drops: self.rate_limited_drops,
        }
    }
}

impl Transport for SimTransport {
    fn send(&mut self, sender: Address, receiver: Address, message: NetMessage) {
        self.enqueue(sender, receiver, message);
    }

    fn broadcast(&mut self, sender: Address, receivers: &[Address], message: NetMessage) {
        for &receiver in receivers {
            if receiver != sender {
                self.enqueue(sender, receiver, message.clone());
            }
        }
    }

    fn get_messages(&mut self, receiver: Address) -> Vec<NetMessage> {
        self.inboxes.remove(&receiver).unwrap_or_default()
    }
}
