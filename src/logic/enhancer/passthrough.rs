//! Passthrough enhancer - returns the baseline unchanged

use async_trait::async_trait;

use super::{Enhancement, EnhancementInput, TextEnhancer};

#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughEnhancer;

#[async_trait]
impl TextEnhancer for PassthroughEnhancer {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    async fn enhance(&self, input: EnhancementInput<'_>) -> Enhancement {
        Enhancement::baseline(input.draft)
    }
}
