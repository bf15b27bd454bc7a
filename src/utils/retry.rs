/// Run `op`; if it fails, run `recover` once and retry `op` exactly once.
///
/// `op` is attempted at most twice and `recover` at most once, which bounds
/// the worst-case latency of a failing collaborator. `recover` cannot veto the
/// retry — its own failures are the closure's business to report.
pub fn with_one_retry<T, E>(
    mut recover: impl FnMut(),
    mut op: impl FnMut() -> Result<T, E>,
) -> Result<T, E> {
    match op() {
        Ok(value) => Ok(value),
        Err(_) => {
            recover();
            op()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_skips_recovery() {
        let mut recoveries = 0;
        let mut attempts = 0;
        let result: Result<u32, &str> = with_one_retry(
            || recoveries += 1,
            || {
                attempts += 1;
                Ok(7)
            },
        );
        assert_eq!(result, Ok(7));
        assert_eq!(attempts, 1);
        assert_eq!(recoveries, 0);
    }

    #[test]
    fn one_failure_recovers_then_succeeds() {
        let mut recoveries = 0;
        let mut attempts = 0;
        let result: Result<u32, &str> = with_one_retry(
            || recoveries += 1,
            || {
                attempts += 1;
                if attempts == 1 {
                    Err("transient")
                } else {
                    Ok(42)
                }
            },
        );
        assert_eq!(result, Ok(42));
        assert_eq!(attempts, 2);
        assert_eq!(recoveries, 1);
    }

    #[test]
    fn persistent_failure_stops_after_second_attempt() {
        let mut recoveries = 0;
        let mut attempts = 0;
        let result: Result<u32, &str> = with_one_retry(
            || recoveries += 1,
            || {
                attempts += 1;
                Err("down")
            },
        );
        assert_eq!(result, Err("down"));
        assert_eq!(attempts, 2);
        assert_eq!(recoveries, 1);
    }
}
