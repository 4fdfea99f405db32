use image::{Rgba, RgbaImage};
use thumbgen::{
    layout_block, render_text, solve_font_sizes, FontFace, FontSource, LayoutParams, Panel,
    SizeClass,
};

fn scenario_panel() -> Panel {
    // Matches the 1200x600 canvas of the worked compose scenario.
    Panel {
        top_margin: 90,
        trapezoid_height: 510,
        left_top_x: 600,
        left_bottom_x: 440,
        right_x: 1200,
        bottom_y: 600,
    }
}

fn four_sections() -> Vec<(String, String)> {
    vec![
        ("国/都市".into(), "フランス・パリ".into()),
        ("留学先".into(), "パリ大学".into()),
        ("期間".into(), "2025年9月〜2026年6月".into()),
        ("留学開始時所属".into(), "文学部3年".into()),
    ]
}

#[test]
fn solver_matches_worked_scenario() {
    // trapezoid 510, 4 sections: 9 lines, 16.2 units, sizes 28 and 42.
    let (base, name) = solve_font_sizes(510, 4, &LayoutParams::default());
    assert_eq!(base, 28);
    assert_eq!(name, 42);
}

#[test]
fn solver_is_monotonic_in_section_count() {
    let params = LayoutParams::default();
    let mut prev = u32::MAX;
    for n in 0..10 {
        let (base, name) = solve_font_sizes(510, n, &params);
        assert!(base <= prev, "base grew at n={n}");
        assert_eq!(name, base * 3 / 2, "name must be floor(1.5 * base)");
        prev = base;
    }
}

#[test]
fn block_shape_and_cursor_positions() {
    let panel = scenario_panel();
    let block = layout_block(&panel, &LayoutParams::default(), "山田太郎", &four_sections());

    // Name line plus (label, value) per section.
    assert_eq!(block.lines.len(), 9);
    assert_eq!(block.lines[0].class, SizeClass::Name);
    assert!(block.lines[1..]
        .iter()
        .all(|l| l.class == SizeClass::Body));

    // One line of top padding, constant left anchor.
    assert_eq!(block.lines[0].y, panel.top_margin + block.base_px);
    assert!(block.lines.iter().all(|l| l.x == panel.left_top_x + 40));

    // Vertical positions strictly increase.
    for pair in block.lines.windows(2) {
        assert!(pair[0].y < pair[1].y, "cursor did not advance");
    }

    // Values carry the ideographic-space indent, labels do not.
    assert!(block.lines[2].text.starts_with('\u{3000}'));
    assert!(!block.lines[1].text.starts_with('\u{3000}'));
}

#[test]
fn cursor_terminates_within_one_line_of_panel_bottom() {
    for canvas_h in [200u32, 300, 600, 1000, 2000] {
        let top_margin = (canvas_h as f32 * 0.15).round() as u32;
        let panel = Panel {
            top_margin,
            trapezoid_height: canvas_h - top_margin,
            left_top_x: 600,
            left_bottom_x: 440,
            right_x: 1200,
            bottom_y: canvas_h,
        };
        let block = layout_block(&panel, &LayoutParams::default(), "name", &four_sections());
        let slack = (block.base_px as f32 * 1.4) as u32;
        assert!(
            block.end_y <= panel.bottom_y + slack,
            "end_y {} overruns panel bottom {} at H={canvas_h}",
            block.end_y,
            panel.bottom_y
        );
    }
}

#[test]
fn empty_fields_reserve_their_line_height() {
    let panel = scenario_panel();
    let params = LayoutParams::default();

    let filled = layout_block(&panel, &params, "山田太郎", &four_sections());
    let blank_sections: Vec<(String, String)> = four_sections()
        .into_iter()
        .map(|(label, _)| (label, String::new()))
        .collect();
    let blank = layout_block(&panel, &params, "", &blank_sections);

    let ys = |b: &thumbgen::TextBlock| b.lines.iter().map(|l| l.y).collect::<Vec<_>>();
    assert_eq!(ys(&filled), ys(&blank));
    assert_eq!(filled.end_y, blank.end_y);
}

#[test]
fn zero_sections_is_just_the_name_line() {
    let panel = scenario_panel();
    let block = layout_block(&panel, &LayoutParams::default(), "only a name", &[]);
    assert_eq!(block.lines.len(), 1);
    assert_eq!(block.lines[0].class, SizeClass::Name);
}

#[test]
fn fallback_face_burns_pixels_into_the_canvas() {
    let mut canvas = RgbaImage::from_pixel(200, 200, Rgba([255, 255, 255, 255]));
    let panel = Panel {
        top_margin: 20,
        trapezoid_height: 180,
        left_top_x: 50,
        left_bottom_x: 30,
        right_x: 200,
        bottom_y: 200,
    };
    let face = FontSource::file("/no/such/font.otf").resolve_or_fallback();
    assert!(matches!(face, FontFace::Builtin));

    let block = render_text(&mut canvas, &panel, &LayoutParams::default(), &face, "A", &[]);

    // 'A' row 0 is .###. -> columns 1..=3 of the glyph cell are set.
    let x = block.lines[0].x + 1;
    let y = block.lines[0].y;
    assert_eq!(*canvas.get_pixel(x, y), Rgba([0, 0, 0, 255]));
}

#[test]
fn layout_params_deserialize_with_defaults() {
    let d: LayoutParams = serde_json::from_str("{}").unwrap();
    assert_eq!(d.section_gap_px, 10);
    assert!((d.line_spacing_ratio - 0.4).abs() < 1e-6);

    let o: LayoutParams = serde_json::from_str(r#"{"section_gap_px": 4}"#).unwrap();
    assert_eq!(o.section_gap_px, 4);
    assert!((o.name_scale - 1.5).abs() < 1e-6);
}
