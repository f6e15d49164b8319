use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use tokio::{task::JoinHandle, time::interval};

pub static METER: Meter = Meter::new();

const LOG_INTERVAL: Duration = Duration::from_secs(30);

/// Counters of processed captures, reset whenever they are logged.
#[derive(Default)]
pub struct Meter {
    captures: AtomicU64,
    objects: AtomicU64,
}

impl Meter {
    pub const fn new() -> Meter {
        Meter {
            captures: AtomicU64::new(0),
            objects: AtomicU64::new(0),
        }
    }

    pub fn tick_capture(&self, num_objects: usize) {
        self.captures.fetch_add(1, Ordering::Relaxed);
        self.objects.fetch_add(num_objects as u64, Ordering::Relaxed);
    }

    pub fn get_reset_captures(&self) -> u64 {
        self.captures.swap(0, Ordering::Relaxed)
    }

    pub fn get_reset_objects(&self) -> u64 {
        self.objects.swap(0, Ordering::Relaxed)
    }
}

pub fn spawn_meter_logger() -> JoinHandle<()> {
    tokio::spawn(async {
        let mut log_interval = interval(LOG_INTERVAL);
        log_interval.tick().await;

        loop {
            let start = Instant::now();
            log_interval.tick().await;

            let captures = METER.get_reset_captures();
            let objects = METER.get_reset_objects();
            let elapsed = start.elapsed().as_secs_f32();

            if captures > 0 {
                log::info!(
                    "Processed {captures} captures ({:.2}/min) with {objects} objects",
                    captures as f32 * 60.0 / elapsed
                )
            }
        }
    })
}
