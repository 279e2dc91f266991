use std::ffi::OsStr;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

/// Maps an executable name to the pid currently running it.
pub trait ProcessResolver: Send {
    /// Take a fresh view of the process table. Called once per tick before
    /// any `resolve`.
    fn refresh(&mut self) {}

    /// `None` when no process with that executable name is running.
    fn resolve(&self, name: &str) -> Option<u32>;
}

/// Resolver backed by the `sysinfo` process table.
pub struct SysinfoResolver {
    system: System,
}

impl SysinfoResolver {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SysinfoResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessResolver for SysinfoResolver {
    fn refresh(&mut self) {
        // Names and pids only; the counters come from procfs directly.
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing(),
        );
    }

    fn resolve(&self, name: &str) -> Option<u32> {
        // Several matches: prefer the oldest pid so the choice is stable.
        self.system
            .processes_by_exact_name(OsStr::new(name))
            .map(|p| p.pid().as_u32())
            .filter(|&pid| pid != 0)
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_name_resolves_to_none() {
        let mut resolver = SysinfoResolver::new();
        resolver.refresh();
        assert_eq!(resolver.resolve("no-such-executable-zz9"), None);
    }

    #[test]
    fn test_resolves_own_process() {
        let comm = std::fs::read_to_string("/proc/self/comm").unwrap();
        let comm = comm.trim_end_matches('\n');
        let own_pid = std::process::id();

        let mut resolver = SysinfoResolver::new();
        resolver.refresh();
        let pid = resolver.resolve(comm).unwrap();

        // Lowest matching pid wins; another copy of this binary may be older.
        assert!(pid <= own_pid);
        if pid != own_pid {
            let other = std::fs::read_to_string(format!("/proc/{}/comm", pid)).unwrap();
            assert_eq!(other.trim_end_matches('\n'), comm);
        }
    }

    #[test]
    fn test_nothing_resolves_before_refresh() {
        let resolver = SysinfoResolver::new();
        assert_eq!(resolver.resolve("init"), None);
    }
}
