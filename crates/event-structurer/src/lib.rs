//! Event structuring and a simulated producer for the telemetry bridge.
//!
//! - `generate_telemetry_event`: raw insight data to a reward-scored packet
//! - `EventStream`: local JSONL copy of every structured packet
//! - `Simulator`: produces task updates and hands them to a bridge

mod simulator;
mod stream;
mod structurer;

pub use simulator::{Simulator, SIMULATED_STATES, SIMULATED_USERS};
pub use stream::EventStream;
pub use structurer::{
    generate_telemetry_event, reward_for, DEFAULT_CONTEXT, EVENT_SOURCE, REWARD_MAP,
};
