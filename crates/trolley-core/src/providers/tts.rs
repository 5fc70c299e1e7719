use async_trait::async_trait;

/// External text-to-speech collaborator. Returns a URL for the generated audio,
/// or `None` when nothing was produced.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice_id: &str) -> anyhow::Result<Option<String>>;
}
