//! OS signal handling.
//!
//! The services themselves run on plain threads; a throwaway current-thread
//! Tokio runtime is only used to wait for Ctrl-C.

/// Block the calling thread until Ctrl-C is received.
pub fn wait_for_ctrl_c() -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(tokio::signal::ctrl_c())?;
    tracing::info!("Ctrl-C received, shutting down");
    Ok(())
}
