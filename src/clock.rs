use std::sync::Mutex;

/// Strictly monotone counter: every tick returns a value greater than both
/// the previous tick and the caller-supplied seed.
///
/// Re-seeded to zero on construction; callers pass the largest stamp they
/// know about so the counter resumes past persisted state.
#[derive(Debug, Default)]
pub struct Clock {
    tick: Mutex<u64>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&self, v: u64) -> u64 {
        let mut t = self.tick.lock().expect("clock mutex poisoned");
        if v > *t {
            *t = v + 1;
        } else {
            *t += 1;
        }
        *t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn strictly_increasing() {
        let c = Clock::new();
        let mut prev = 0;
        for _ in 0..100 {
            let t = c.tick(0);
            assert!(t > prev);
            prev = t;
        }
    }

    #[test]
    fn seed_jumps_the_counter() {
        let c = Clock::new();
        assert_eq!(c.tick(0), 1);
        assert_eq!(c.tick(41), 42);
        // A stale seed does not move the counter backwards.
        assert_eq!(c.tick(5), 43);
    }

    #[test]
    fn concurrent_ticks_never_collide() {
        let c = Arc::new(Clock::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let c = Arc::clone(&c);
            handles.push(thread::spawn(move || {
                (0..500).map(|_| c.tick(0)).collect::<Vec<u64>>()
            }));
        }

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let n = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), n, "duplicate stamps handed out");
    }
}
