use selkie::{Embedding, EmbeddingOptions, SimilarityRecord};
use selkie_render::{Error, PlotOptions, RasterOptions, render_embedding, render_svg, svg_to_png};

fn birds() -> Embedding {
    let records = [
        SimilarityRecord::new("sea_gull", "rock_dove", 0.4),
        SimilarityRecord::new("sea_gull", "tern", 0.8),
        SimilarityRecord::new("rock_dove", "tern", 0.3),
        SimilarityRecord::new("tern", "s&p<500>", 0.2),
    ];
    let mut e =
        Embedding::from_records(&records, "sea_gull", EmbeddingOptions::default()).unwrap();
    selkie::relax(&mut e, 100).unwrap();
    e
}

#[test]
fn plot_shows_display_labels_and_styles_the_reference() {
    let svg = render_embedding(&birds(), &PlotOptions::default()).unwrap();
    assert!(svg.starts_with("<svg"));
    assert!(svg.ends_with("</svg>"));
    assert!(svg.contains(r#"fill="red" font-weight="bold">Sea Gull</text>"#), "{svg}");
    assert!(svg.contains(r#"fill="blue">Rock Dove</text>"#));
    assert!(svg.contains("S&amp;p&lt;500&gt;"));
    assert_eq!(svg.matches("<circle").count(), 4);
}

#[test]
fn hidden_entities_are_not_drawn() {
    let mut e = birds();
    e.set_included("tern", false).unwrap();
    let svg = render_embedding(&e, &PlotOptions::default()).unwrap();
    assert!(!svg.contains(">Tern<"));
    assert_eq!(svg.matches("<circle").count(), 3);

    for label in ["sea_gull", "rock_dove", "s&p<500>"] {
        e.set_included(label, false).unwrap();
    }
    assert!(matches!(
        render_embedding(&e, &PlotOptions::default()),
        Err(Error::EmptyPlot)
    ));
}

#[test]
fn only_two_or_three_dimensions_can_be_plotted() {
    let placements = birds().placements();
    for dimensions in [0, 1, 4] {
        let err = render_svg(&placements, dimensions, &PlotOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidDimensionCount { dimensions: d } if d == dimensions));
    }
}

#[test]
fn plot_rasterizes_to_png() {
    let options = PlotOptions {
        size: 200.0,
        pad: 20.0,
        draw_points: true,
        ..Default::default()
    };
    let svg = render_embedding(&birds(), &options).unwrap();
    let png = svg_to_png(&svg, &RasterOptions::default()).unwrap();
    assert!(png.starts_with(b"\x89PNG\r\n\x1a\n"));
}
