// The jiffy clock, kept as an offset from the host's time of day.
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::{Context, Registers};

const JIFFIES_PER_SECOND: u64 = 60;
pub const JIFFIES_PER_DAY: u32 = 24 * 60 * 60 * JIFFIES_PER_SECOND as u32;

#[derive(Debug, Default, Clone, Copy)]
pub struct JiffyClock {
    offset: i64,
}

fn host_time_of_day() -> Duration {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    Duration::new(now.as_secs() % 86_400, now.subsec_nanos())
}

fn to_jiffies(time_of_day: Duration) -> i64 {
    (time_of_day.as_millis() as u64 * JIFFIES_PER_SECOND / 1000) as i64
}

impl JiffyClock {
    pub fn read_at(&self, time_of_day: Duration) -> u32 {
        (to_jiffies(time_of_day) + self.offset).rem_euclid(JIFFIES_PER_DAY as i64) as u32
    }

    pub fn set_at(&mut self, time_of_day: Duration, jiffies: u32) {
        self.offset = jiffies as i64 - to_jiffies(time_of_day);
    }

    pub fn read(&self) -> u32 {
        self.read_at(host_time_of_day())
    }

    pub fn set(&mut self, jiffies: u32) {
        self.set_at(host_time_of_day(), jiffies);
    }
}

/// RDTIM: A = low, X = middle, Y = high byte of the jiffy count.
pub fn rdtim(ctx: &mut Context, mut regs: Registers) -> Registers {
    let [low, mid, high, _] = ctx.clock.read().to_le_bytes();
    regs.a = low;
    regs.x = mid;
    regs.y = high;
    regs
}

pub fn settim(ctx: &mut Context, regs: Registers) -> Registers {
    let jiffies = u32::from_le_bytes([regs.a, regs.x, regs.y, 0]);
    ctx.clock.set(jiffies % JIFFIES_PER_DAY);
    regs
}

// The clock follows host time, so there is nothing to advance.
pub fn udtim(_ctx: &mut Context, regs: Registers) -> Registers {
    regs
}
