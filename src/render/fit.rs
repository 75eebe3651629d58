use crate::foundation::core::{FillMode, PixelSize, Rect, StretchDirection};

/// Destination rectangle for a clip of `natural` size drawn into a `target` surface.
///
/// The result is centred in the target and may extend past its edges (`UniformToFill`, or
/// `None` with a clip larger than the surface).
pub fn fit_rect(
    natural: PixelSize,
    target: PixelSize,
    fill: FillMode,
    direction: StretchDirection,
) -> Rect {
    let nw = f64::from(natural.width);
    let nh = f64::from(natural.height);
    let tw = f64::from(target.width);
    let th = f64::from(target.height);
    if nw <= 0.0 || nh <= 0.0 {
        return Rect::ZERO;
    }

    let (sx, sy) = match fill {
        FillMode::None => (1.0, 1.0),
        FillMode::Fill => (tw / nw, th / nh),
        FillMode::Uniform => {
            let s = (tw / nw).min(th / nh);
            (s, s)
        }
        FillMode::UniformToFill => {
            let s = (tw / nw).max(th / nh);
            (s, s)
        }
    };
    let (sx, sy) = (restrict(sx, direction), restrict(sy, direction));

    let w = nw * sx;
    let h = nh * sy;
    let x0 = (tw - w) / 2.0;
    let y0 = (th - h) / 2.0;
    Rect::new(x0, y0, x0 + w, y0 + h)
}

fn restrict(scale: f64, direction: StretchDirection) -> f64 {
    match direction {
        StretchDirection::Both => scale,
        StretchDirection::UpOnly => scale.max(1.0),
        StretchDirection::DownOnly => scale.min(1.0),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/fit.rs"]
mod tests;
