use super::*;

fn any_system_font() -> Option<PathBuf> {
    let mut stack = vec![PathBuf::from("/usr/share/fonts")];
    while let Some(dir) = stack.pop() {
        let Ok(rd) = std::fs::read_dir(&dir) else {
            continue;
        };
        for path in rd.flatten().map(|e| e.path()) {
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().and_then(|e| e.to_str()) == Some("ttf") {
                return Some(path);
            }
        }
    }
    None
}

#[test]
fn fonts_next_to_the_clip_are_loaded() {
    let Some(font) = any_system_font() else {
        return;
    };
    let dir = PathBuf::from("target").join("unit_svg_load_fonts");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(dir.join("fonts")).unwrap();
    std::fs::copy(&font, dir.join("fonts").join("Local.TTF")).unwrap();
    std::fs::write(dir.join("readme.txt"), "not a font").unwrap();

    let base = SvgLoader::new(None).font_faces();
    let with_dir = SvgLoader::new(Some(&dir)).font_faces();
    assert!(with_dir > base, "{with_dir} <= {base}");
}

#[test]
fn missing_font_dir_is_ignored() {
    let dir = PathBuf::from("target").join("unit_svg_load_no_such_dir");
    let _ = std::fs::remove_dir_all(&dir);
    let loader = SvgLoader::new(Some(&dir));
    assert_eq!(loader.font_faces(), SvgLoader::new(None).font_faces());
}

#[test]
fn read_reports_the_failing_path() {
    let dir = PathBuf::from("target").join("unit_svg_load_bad");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("broken.svg");
    std::fs::write(&path, "<svg").unwrap();

    let err = SvgLoader::new(None).read(&path).unwrap_err();
    assert!(matches!(err, VanimError::Decode(_)));
    assert!(err.to_string().contains("broken.svg"), "{err}");
}
