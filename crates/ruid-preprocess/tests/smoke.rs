use ruid_preprocess::{rgb_len, Filter, Resizer};

#[test]
fn cpu_smoke() {
    // White 640×480 RGB
    let (w, h) = (640, 480);
    let bytes = vec![255u8; rgb_len(w, h)];

    for filter in [Filter::Point, Filter::Triangle, Filter::CatmullRom, Filter::Lanczos3] {
        let mut pp = Resizer::new((224, 224)).unwrap().with_filter(filter);
        let out = pp.run((w, h), &bytes).unwrap();
        assert_eq!(out.len(), 224 * 224 * 3);
    }
}

#[test]
fn upscale_keeps_dimensions() {
    let mut pp = Resizer::new((1280, 720)).unwrap();
    let out = pp.run((32, 24), &vec![7u8; rgb_len(32, 24)]).unwrap();
    assert_eq!(out.len(), rgb_len(1280, 720));
    assert_eq!(pp.dst_size(), (1280, 720));
}
