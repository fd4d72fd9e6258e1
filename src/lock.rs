use std::sync::{Mutex, MutexGuard};

/// Lock `lock`, taking the inner value back if a panicking thread poisoned it.
///
/// The recorder and controller keep going after a worker panic; the state they
/// guard is always left consistent between statements.
pub(crate) fn lock_or_recover<'a, T>(lock: &'a Mutex<T>, context: &str) -> MutexGuard<'a, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        crate::log_debug(&format!("{context}: mutex poisoned, recovering inner state"));
        poisoned.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn recovers_value_from_poisoned_mutex() {
        let shared = Arc::new(Mutex::new(7u32));
        let poisoner = shared.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(shared.is_poisoned());
        assert_eq!(*lock_or_recover(&shared, "test"), 7);
    }
}
