use plotters::style::RGBColor;

/// The classic category10 qualitative palette.
pub const CATEGORY10: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

/// Stable color for the i-th series or slice; cycles past ten.
pub fn color_for(index: usize) -> RGBColor {
    CATEGORY10[index % CATEGORY10.len()]
}
