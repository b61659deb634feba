//! Native (host) functions installed into every fresh VM's globals.

use std::sync::OnceLock;
use std::time::Instant;

use vitte_core::object::NativeFn;
use vitte_core::value::Value;

pub const NATIVES: &[(&str, u8, NativeFn)] = &[("clock", 0, clock)];

static PROCESS_START: OnceLock<Instant> = OnceLock::new();

fn clock(_args: &[Value]) -> Result<Value, String> {
    let start = PROCESS_START.get_or_init(Instant::now);
    Ok(Value::number(start.elapsed().as_secs_f64()))
}
