use tonemap_core::config::EmbeddingSettings;
use tonemap_embed::get_default_embedder;

fn fake_settings(dim: usize) -> EmbeddingSettings {
    EmbeddingSettings { dim, use_fake: true, ..EmbeddingSettings::default() }
}

#[test]
fn fake_embedder_shapes_and_determinism() {
    let embedder = get_default_embedder(&fake_settings(384)).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string(), "something else".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    assert_eq!(embs.len(), 3);
    let (v1, v2) = (&embs[0], &embs[1]);

    assert_eq!(v1.len(), 384, "embedding dim follows settings");
    assert_eq!(embedder.dim(), 384);
    assert!(embedder.model_id().starts_with("fake:"));

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
    assert_ne!(v1, &embs[2]);
}

#[test]
fn fake_embedder_handles_empty_text() {
    let embedder = get_default_embedder(&fake_settings(16)).expect("embedder");
    let embs = embedder.embed_batch(&[String::new()]).expect("embed");
    let norm: f32 = embs[0].iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-6);
    assert!(embedder.embed_batch(&[]).expect("empty batch").is_empty());
}
