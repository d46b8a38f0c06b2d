//! Canvas and WebGL fingerprinting probes.
//!
//! A probe wraps a freshly created, off-document rendering surface in an
//! interceptor that records calls to the identifying read path, replays a
//! representative fingerprinting sequence through it, and reports whether the
//! read path was exercised. Surfaces come from a [`SurfaceFactory`] so the
//! browser binding can supply real contexts and tests can supply fakes.

pub const PROBE_WIDTH: u32 = 220;
pub const PROBE_HEIGHT: u32 = 30;
pub const PROBE_FONT: &str = "14px 'Arial'";
pub const PROBE_TEXT: &str = "Cwm fjordbank glyphs vext quiz, \u{1F603}";

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Rendering context unavailable: {0}")]
    Unavailable(&'static str),
    #[error("Probe call failed: {0}")]
    CallFailed(String),
}

/// The subset of a 2D drawing context a fingerprinting script uses.
pub trait CanvasSurface {
    fn set_font(&mut self, font: &str) -> Result<(), ProbeError>;
    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<(), ProbeError>;
    /// Read back RGBA pixels from the top-left corner.
    fn read_pixels(&mut self, width: u32, height: u32) -> Result<Vec<u8>, ProbeError>;
}

/// WebGL parameters a fingerprinting script queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlParameter {
    Version,
    ShadingLanguageVersion,
}

/// The subset of a WebGL context a fingerprinting script uses.
pub trait GlSurface {
    fn get_parameter(&mut self, parameter: GlParameter) -> Result<Option<String>, ProbeError>;
}

/// Creates off-document rendering surfaces.
pub trait SurfaceFactory {
    type Canvas: CanvasSurface;
    type Gl: GlSurface;

    fn canvas_2d(&self) -> Result<Self::Canvas, ProbeError>;
    fn webgl(&self) -> Result<Self::Gl, ProbeError>;
}

/// Interceptor recording pixel reads on a canvas surface.
pub struct PixelReadProbe<S> {
    inner: S,
    pixel_reads: u32,
}

impl<S: CanvasSurface> PixelReadProbe<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, pixel_reads: 0 }
    }

    pub fn exercised(&self) -> bool {
        self.pixel_reads > 0
    }
}

impl<S: CanvasSurface> CanvasSurface for PixelReadProbe<S> {
    fn set_font(&mut self, font: &str) -> Result<(), ProbeError> {
        self.inner.set_font(font)
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<(), ProbeError> {
        self.inner.fill_text(text, x, y)
    }

    fn read_pixels(&mut self, width: u32, height: u32) -> Result<Vec<u8>, ProbeError> {
        self.pixel_reads += 1;
        self.inner.read_pixels(width, height)
    }
}

/// Interceptor recording parameter queries on a WebGL surface.
pub struct ParameterQueryProbe<S> {
    inner: S,
    queried: Vec<GlParameter>,
}

impl<S: GlSurface> ParameterQueryProbe<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, queried: Vec::new() }
    }

    pub fn exercised(&self) -> bool {
        !self.queried.is_empty()
    }

    pub fn queried(&self) -> &[GlParameter] {
        &self.queried
    }
}

impl<S: GlSurface> GlSurface for ParameterQueryProbe<S> {
    fn get_parameter(&mut self, parameter: GlParameter) -> Result<Option<String>, ProbeError> {
        self.queried.push(parameter);
        self.inner.get_parameter(parameter)
    }
}

/// Draw fixed text and read the pixels back through an instrumented surface.
pub fn detect_canvas_fingerprint<F: SurfaceFactory + ?Sized>(factory: &F) -> bool {
    let run = || -> Result<bool, ProbeError> {
        let mut probe = PixelReadProbe::new(factory.canvas_2d()?);
        probe.set_font(PROBE_FONT)?;
        probe.fill_text(PROBE_TEXT, 2.0, 15.0)?;
        probe.read_pixels(PROBE_WIDTH, PROBE_HEIGHT)?;
        Ok(probe.exercised())
    };
    run().unwrap_or_else(|e| {
        log::debug!("Canvas probe degraded: {e}");
        false
    })
}

/// Query version and shading-language parameters through an instrumented context.
pub fn detect_webgl_fingerprint<F: SurfaceFactory + ?Sized>(factory: &F) -> bool {
    let run = || -> Result<bool, ProbeError> {
        let mut probe = ParameterQueryProbe::new(factory.webgl()?);
        probe.get_parameter(GlParameter::Version)?;
        probe.get_parameter(GlParameter::ShadingLanguageVersion)?;
        Ok(probe.exercised())
    };
    run().unwrap_or_else(|e| {
        log::debug!("WebGL probe degraded: {e}");
        false
    })
}

/// Surface type for environments without any rendering support.
pub enum Unsupported {}

impl CanvasSurface for Unsupported {
    fn set_font(&mut self, _font: &str) -> Result<(), ProbeError> {
        match *self {}
    }

    fn fill_text(&mut self, _text: &str, _x: f64, _y: f64) -> Result<(), ProbeError> {
        match *self {}
    }

    fn read_pixels(&mut self, _width: u32, _height: u32) -> Result<Vec<u8>, ProbeError> {
        match *self {}
    }
}

impl GlSurface for Unsupported {
    fn get_parameter(&mut self, _parameter: GlParameter) -> Result<Option<String>, ProbeError> {
        match *self {}
    }
}

/// Factory that never yields a surface, e.g. for scans outside a browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSurfaces;

impl SurfaceFactory for NoSurfaces {
    type Canvas = Unsupported;
    type Gl = Unsupported;

    fn canvas_2d(&self) -> Result<Self::Canvas, ProbeError> {
        Err(ProbeError::Unavailable("2d"))
    }

    fn webgl(&self) -> Result<Self::Gl, ProbeError> {
        Err(ProbeError::Unavailable("webgl"))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// In-memory surfaces with switchable failure points.
    #[derive(Default)]
    pub(crate) struct FakeSurfaces {
        pub canvas_missing: bool,
        pub pixels_tainted: bool,
        pub webgl_missing: bool,
    }

    pub(crate) struct FakeCanvas {
        tainted: bool,
        drawn: bool,
    }

    pub(crate) struct FakeGl;

    impl CanvasSurface for FakeCanvas {
        fn set_font(&mut self, _font: &str) -> Result<(), ProbeError> {
            Ok(())
        }

        fn fill_text(&mut self, _text: &str, _x: f64, _y: f64) -> Result<(), ProbeError> {
            self.drawn = true;
            Ok(())
        }

        fn read_pixels(&mut self, width: u32, height: u32) -> Result<Vec<u8>, ProbeError> {
            if self.tainted {
                return Err(ProbeError::CallFailed("SecurityError".into()));
            }
            let fill = if self.drawn { 0x7f } else { 0 };
            Ok(vec![fill; (width * height * 4) as usize])
        }
    }

    impl GlSurface for FakeGl {
        fn get_parameter(&mut self, parameter: GlParameter) -> Result<Option<String>, ProbeError> {
            Ok(Some(match parameter {
                GlParameter::Version => "WebGL 1.0".to_string(),
                GlParameter::ShadingLanguageVersion => "WebGL GLSL ES 1.0".to_string(),
            }))
        }
    }

    impl SurfaceFactory for FakeSurfaces {
        type Canvas = FakeCanvas;
        type Gl = FakeGl;

        fn canvas_2d(&self) -> Result<FakeCanvas, ProbeError> {
            if self.canvas_missing {
                return Err(ProbeError::Unavailable("2d"));
            }
            Ok(FakeCanvas { tainted: self.pixels_tainted, drawn: false })
        }

        fn webgl(&self) -> Result<FakeGl, ProbeError> {
            if self.webgl_missing {
                return Err(ProbeError::Unavailable("webgl"));
            }
            Ok(FakeGl)
        }
    }

    #[test]
    fn test_canvas_probe_sees_pixel_read() {
        assert!(detect_canvas_fingerprint(&FakeSurfaces::default()));
    }

    #[test]
    fn test_canvas_probe_failures_yield_false() {
        let missing = FakeSurfaces { canvas_missing: true, ..Default::default() };
        assert!(!detect_canvas_fingerprint(&missing));
        let tainted = FakeSurfaces { pixels_tainted: true, ..Default::default() };
        assert!(!detect_canvas_fingerprint(&tainted));
        assert!(!detect_canvas_fingerprint(&NoSurfaces));
    }

    #[test]
    fn test_webgl_probe_records_queries() {
        let mut probe = ParameterQueryProbe::new(FakeGl);
        assert!(!probe.exercised());
        probe.get_parameter(GlParameter::Version).unwrap();
        assert_eq!(probe.queried(), &[GlParameter::Version]);

        assert!(detect_webgl_fingerprint(&FakeSurfaces::default()));
        let missing = FakeSurfaces { webgl_missing: true, ..Default::default() };
        assert!(!detect_webgl_fingerprint(&missing));
    }

    #[test]
    fn test_pixel_probe_counts_reads_only() {
        let mut probe = PixelReadProbe::new(FakeCanvas { tainted: false, drawn: false });
        probe.fill_text("x", 0.0, 0.0).unwrap();
        assert!(!probe.exercised());
        let pixels = probe.read_pixels(2, 2).unwrap();
        assert_eq!(pixels.len(), 16);
        assert!(probe.exercised());
    }
}
