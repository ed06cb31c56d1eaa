use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

/// BERT-family padding token id.
const PAD_ID: u32 = 0;

/// Tokenize a batch into `(input_ids, attention_mask)` tensors of shape
/// `[batch, longest]`, truncating each text to `max_len` tokens.
pub fn tokenize_batch(tokenizer: &Tokenizer, texts: &[String], max_len: usize, device: &Device) -> Result<(Tensor, Tensor)> {
    let mut rows = Vec::with_capacity(texts.len());
    for text in texts {
        let enc = tokenizer.encode(text.as_str(), true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let mut ids = enc.get_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        ids.truncate(max_len);
        mask.truncate(max_len);
        rows.push((ids, mask));
    }
    let longest = rows.iter().map(|(ids, _)| ids.len()).max().unwrap_or(0).max(1);
    let mut flat_ids = Vec::with_capacity(rows.len() * longest);
    let mut flat_mask = Vec::with_capacity(rows.len() * longest);
    for (mut ids, mut mask) in rows {
        ids.resize(longest, PAD_ID);
        mask.resize(longest, 0);
        flat_ids.extend(ids);
        flat_mask.extend(mask);
    }
    let input_ids = Tensor::from_vec(flat_ids, (texts.len(), longest), device)?;
    let attention_mask = Tensor::from_vec(flat_mask, (texts.len(), longest), device)?;
    Ok((input_ids, attention_mask))
}
