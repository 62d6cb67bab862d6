use tracing_subscriber::{fmt, layer::Layer as LayerTrait, registry::LookupSpan};

use crate::logging::config::LoggingConfig;

/// JSON-формат для сбора логов внешними системами.
pub fn build_json_layer<S, W>(
    config: &LoggingConfig,
    writer: W,
    with_ansi: bool,
) -> Box<dyn LayerTrait<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'writer> fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    let json_fmt = fmt::format().json().with_current_span(true).with_span_list(false);

    let layer = fmt::layer()
        .event_format(json_fmt)
        .fmt_fields(fmt::format::JsonFields::new())
        .with_writer(writer)
        .with_ansi(with_ansi)
        .with_target(config.with_target);

    Box::new(layer)
}
