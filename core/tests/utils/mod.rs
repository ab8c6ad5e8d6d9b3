pub fn setup_test_logger() {
    let _ = env_logger::Builder::from_env("CHANLAST_LOG").try_init();
}
