pub trait TokenCounter {
    fn count_tokens(&self, content: &str) -> usize;
}

/// Approximate GPT-style accounting: tokens := ceil(len(content) / 4).
///
/// Budgets are an abstract size unit; this only has to be deterministic and
/// roughly proportional to real tokenizer output.
#[derive(Default)]
pub struct ApproxTokenCounter;

impl TokenCounter for ApproxTokenCounter {
    fn count_tokens(&self, content: &str) -> usize {
        if content.is_empty() {
            0
        } else {
            (content.len() + 3) / 4
        }
    }
}
