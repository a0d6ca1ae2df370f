//! This module provides ways to tweak mocked calendars, so that they can return errors on some tests
#![cfg(any(test, feature = "local_calendar_mocks_remote_calendars"))]

use crate::error::{Error, Result};

/// This stores some behaviour tweaks, that describe how a mocked instance will behave during a given test
///
/// So that a functions fails _n_ times after _m_ initial successes, set `(m, n)` for the suited parameter
#[derive(Default, Clone, Debug)]
pub struct MockBehaviour {
    /// If this is true, every action will be allowed
    pub is_suspended: bool,

    pub query_behaviour: (u32, u32),
    pub add_item_behaviour: (u32, u32),
    pub update_item_behaviour: (u32, u32),
    pub delete_item_behaviour: (u32, u32),
}

impl MockBehaviour {
    pub fn new() -> Self {
        Self::default()
    }

    /// All items will fail at once, for `n_fails` times
    pub fn fail_now(n_fails: u32) -> Self {
        Self {
            is_suspended: false,
            query_behaviour: (0, n_fails),
            add_item_behaviour: (0, n_fails),
            update_item_behaviour: (0, n_fails),
            delete_item_behaviour: (0, n_fails),
        }
    }

    /// Suspend this mock behaviour until you call `resume`
    pub fn suspend(&mut self) {
        self.is_suspended = true;
    }
    /// Make this behaviour active again
    pub fn resume(&mut self) {
        self.is_suspended = false;
    }

    pub fn can_query(&mut self) -> Result<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.query_behaviour, "query")
    }
    pub fn can_add_item(&mut self) -> Result<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.add_item_behaviour, "add_item")
    }
    pub fn can_update_item(&mut self) -> Result<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.update_item_behaviour, "update_item")
    }
    pub fn can_delete_item(&mut self) -> Result<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.delete_item_behaviour, "delete_item")
    }
}


/// Return Ok(()) in case the value is `(1+, _)` or `(_, 0)`, or return Err and decrement otherwise
fn decrement(value: &mut (u32, u32), descr: &str) -> Result<()> {
    let remaining_successes = value.0;
    let remaining_failures = value.1;

    if remaining_successes > 0 {
        value.0 -= 1;
        log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
        Ok(())
    } else if remaining_failures > 0 {
        value.1 -= 1;
        log::debug!("Mock behaviour: failing a {} ({:?})", descr, value);
        Err(Error::Mocked(format!("Mocked behaviour requires this {} to fail this time. ({:?})", descr, value)))
    } else {
        log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mock_behaviour() {
        let mut ok = MockBehaviour::new();
        for _ in 0..5 {
            assert!(ok.can_query().is_ok());
            assert!(ok.can_delete_item().is_ok());
        }

        let mut now = MockBehaviour::fail_now(2);
        assert!(now.can_query().is_err());
        assert!(now.can_add_item().is_err());
        assert!(now.can_add_item().is_err());
        assert!(now.can_query().is_err());
        assert!(now.can_query().is_ok());
        assert!(now.can_query().is_ok());
        assert!(now.can_add_item().is_ok());

        let mut custom = MockBehaviour{
            query_behaviour: (0,1),
            delete_item_behaviour: (1,3),
            ..MockBehaviour::default()
        };
        assert!(custom.can_query().is_err());
        assert!(custom.can_query().is_ok());
        assert!(custom.can_query().is_ok());
        assert!(custom.can_delete_item().is_ok());
        assert!(custom.can_delete_item().is_err());
        assert!(custom.can_delete_item().is_err());
        assert!(custom.can_delete_item().is_err());
        assert!(custom.can_delete_item().is_ok());
        assert!(custom.can_update_item().is_ok());

        let mut suspended = MockBehaviour::fail_now(1);
        suspended.suspend();
        assert!(suspended.can_update_item().is_ok());
        suspended.resume();
        assert!(suspended.can_update_item().is_err());
    }
}
