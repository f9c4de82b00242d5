/// Requests for the presentation layer that do not touch slideshow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerCommand {
    ToggleFullscreen,
    ExitFullscreen,
    /// Any pointer movement; keeps the controls visible.
    PointerMoved,
}
