mod common;

use common::*;
use rustml_geometric::*;
use safetensors::SafeTensors;
use tempfile::tempdir;

#[test]
fn test_save_load_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("set2set.safetensors");

    let config = Set2SetConfig::new(5, 4)
        .with_num_layers(2)
        .with_padding(PaddingMode::Masked);
    let original = seeded_layer(config.clone(), 1);
    original.save(&path).unwrap();

    let restored = Set2Set::load(&path).unwrap();
    assert_eq!(restored.config(), &config);
    assert_eq!(restored.to_string(), "Set2Set(5, 10)");

    let batch = batch_for_sizes(&[3, 1, 4]);
    let x = seeded_features(batch.len(), 5, 2);
    assert_eq!(
        restored.forward(&x, &batch).unwrap().to_vec(),
        original.forward(&x, &batch).unwrap().to_vec()
    );
}

#[test]
fn test_checkpoint_uses_state_dict_names() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("named.safetensors");

    let s2s = seeded_layer(Set2SetConfig::new(3, 2), 3);
    s2s.save(&path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let st = SafeTensors::deserialize(&bytes).unwrap();
    let mut names = st.names().into_iter().cloned().collect::<Vec<_>>();
    names.sort();
    assert_eq!(
        names,
        vec!["lstm.bias_hh_l0", "lstm.bias_ih_l0", "lstm.weight_hh_l0", "lstm.weight_ih_l0"]
    );
    assert_eq!(st.tensor("lstm.weight_ih_l0").unwrap().shape(), &[12, 6]);

    let (_, metadata) = SafeTensors::read_metadata(&bytes).unwrap();
    let json = &metadata.metadata().as_ref().unwrap()[CONFIG_METADATA_KEY];
    assert_eq!(Set2SetConfig::from_json_str(json).unwrap(), Set2SetConfig::new(3, 2));
}

#[test]
fn test_load_weights_into_existing_layer() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("weights.safetensors");

    let source = seeded_layer(Set2SetConfig::new(4, 3), 4);
    source.save(&path).unwrap();

    let mut target = seeded_layer(Set2SetConfig::new(4, 3), 5);
    let batch = batch_for_sizes(&[2, 2]);
    let x = seeded_features(batch.len(), 4, 6);
    assert_ne!(
        target.forward(&x, &batch).unwrap().to_vec(),
        source.forward(&x, &batch).unwrap().to_vec()
    );

    target.load_weights(&path).unwrap();
    assert_eq!(
        target.forward(&x, &batch).unwrap().to_vec(),
        source.forward(&x, &batch).unwrap().to_vec()
    );
}

#[test]
fn test_load_weights_rejects_other_shapes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wide.safetensors");
    seeded_layer(Set2SetConfig::new(6, 2), 7).save(&path).unwrap();

    let mut narrow = seeded_layer(Set2SetConfig::new(4, 2), 8);
    let before = narrow.state_dict()["lstm.weight_ih_l0"].to_vec();
    assert!(matches!(narrow.load_weights(&path), Err(GeometricError::NnError(_))));
    assert_eq!(narrow.state_dict()["lstm.weight_ih_l0"].to_vec(), before);

    let mut deeper = seeded_layer(Set2SetConfig::new(6, 2).with_num_layers(2), 9);
    assert!(deeper.load_weights(&path).is_err());
}

#[test]
fn test_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("set2set.json");
    std::fs::write(&path, r#"{"in_channels": 8, "processing_steps": 6, "padding": "masked"}"#).unwrap();

    let config = Set2SetConfig::load(&path).unwrap();
    assert_eq!(config, Set2SetConfig::new(8, 6).with_padding(PaddingMode::Masked));

    let s2s = Set2Set::new(config).unwrap();
    assert_eq!(s2s.out_channels(), 16);
    assert_eq!(s2s.padding(), PaddingMode::Masked);

    std::fs::write(&path, "{not json").unwrap();
    assert!(matches!(Set2SetConfig::load(&path), Err(GeometricError::Config(_))));
    assert!(matches!(
        Set2SetConfig::load(dir.path().join("missing.json")),
        Err(GeometricError::Io(_))
    ));
}
