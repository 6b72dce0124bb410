use std::time::Duration;

/// Timing and behavior knobs for a server.
///
/// Defaults match live play; tests shrink the durations to milliseconds.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Lobby countdown length, in ticks.
    pub countdown_ticks: u32,
    /// Wall-clock length of one lobby or countdown tick.
    pub tick_interval: Duration,
    /// Pause after dealing so clients can animate the cards.
    pub deal_pause: Duration,
    /// Pause between rounds and after a dealer change.
    pub round_pause: Duration,
    /// How long to wait for a seat's decision before defaulting to `keep`.
    /// `None` blocks until the client answers or drops.
    pub decision_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            countdown_ticks: 30,
            tick_interval: Duration::from_secs(1),
            deal_pause: Duration::from_millis(500),
            round_pause: Duration::from_secs(2),
            decision_timeout: None,
        }
    }
}
