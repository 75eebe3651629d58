use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        VanimError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(VanimError::decode("x").to_string().contains("decode error:"));
    assert!(VanimError::render("x").to_string().contains("render error:"));
    assert!(VanimError::encode("x").to_string().contains("encode error:"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = VanimError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn anyhow_converts_via_question_mark() {
    fn inner() -> VanimResult<()> {
        use anyhow::Context as _;
        std::fs::read("target/definitely/not/here.bin").context("read fixture")?;
        Ok(())
    }
    let err = inner().unwrap_err();
    assert!(matches!(err, VanimError::Other(_)));
    assert!(err.to_string().contains("read fixture"));
}
