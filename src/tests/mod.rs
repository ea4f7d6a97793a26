mod test_data;
mod test_score;

/// Initialise the test logger once; later calls are no-ops.
pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}
