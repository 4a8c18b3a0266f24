//! Debugger stepping policy.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// How a debugger-driven run decides where to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DebugStepMode {
    /// Run until a breakpoint is reached.
    #[default]
    StopAtBreakpoint,
    /// Stop before the next instruction.
    StepInto,
    /// Stop before the next instruction, running called code to completion.
    StepOver,
}

/// Breakpoint source consulted by a debugger-mode run.
pub trait DebugInfoProvider {
    fn has_breakpoint(&self, address: u16) -> bool;

    /// Address at which a step-over will stop.
    fn imminent_breakpoint(&self) -> Option<u16>;

    fn set_imminent_breakpoint(&mut self, address: Option<u16>);
}

/// A set of breakpoint addresses plus the step-over slot.
#[derive(Debug, Clone, Default)]
pub struct BreakpointSet {
    breakpoints: HashSet<u16>,
    imminent: Option<u16>,
}

impl BreakpointSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, address: u16) {
        self.breakpoints.insert(address);
    }

    pub fn remove(&mut self, address: u16) {
        self.breakpoints.remove(&address);
    }

    pub fn clear(&mut self) {
        self.breakpoints.clear();
        self.imminent = None;
    }
}

impl FromIterator<u16> for BreakpointSet {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        Self {
            breakpoints: iter.into_iter().collect(),
            imminent: None,
        }
    }
}

impl DebugInfoProvider for BreakpointSet {
    fn has_breakpoint(&self, address: u16) -> bool {
        self.breakpoints.contains(&address)
    }

    fn imminent_breakpoint(&self) -> Option<u16> {
        self.imminent
    }

    fn set_imminent_breakpoint(&mut self, address: Option<u16>) {
        self.imminent = address;
    }
}

/// Decide whether to stop before the instruction at `pc`.
///
/// `executed` counts the instructions completed in this run. `call_length`
/// is the encoded length of the instruction at `pc` when it is call-like
/// (CALL, RST, HALT, repeating block instruction) and 0 otherwise.
pub fn is_debug_stop(
    provider: Option<&mut (dyn DebugInfoProvider + 'static)>,
    mode: DebugStepMode,
    executed: i64,
    pc: u16,
    call_length: u16,
) -> bool {
    let Some(provider) = provider else {
        log::trace!("No debug info provider; not stopping at {pc:#06X}");
        return false;
    };

    match mode {
        DebugStepMode::StepInto => executed > 0,
        DebugStepMode::StopAtBreakpoint => provider.has_breakpoint(pc) && executed > 0,
        DebugStepMode::StepOver => match provider.imminent_breakpoint() {
            Some(target) => {
                if target == pc {
                    provider.set_imminent_breakpoint(None);
                    true
                } else {
                    false
                }
            }
            None => {
                let just_armed = call_length > 0;
                if just_armed {
                    provider.set_imminent_breakpoint(Some(pc.wrapping_add(call_length)));
                }
                executed > 0 && (provider.imminent_breakpoint().is_none() || just_armed)
            }
        },
    }
}
