/// The simulation clock. Advanced by one physics step at the end of every tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Time {
    /// Seconds simulated so far
    pub elapsed: f64,
    /// The length of the last step, in seconds
    pub delta: f32,
    /// How many ticks have run
    pub frame: u64,
}

impl Time {
    /// Move the clock forward by `delta` seconds
    pub fn advance(&mut self, delta: f32) {
        self.elapsed += delta as f64;
        self.delta = delta;
        self.frame += 1;
    }
}
