use resticly_ui::{AppContext, LocaleCode, ThemeMode};

use crate::cli::{LanguageArg, OutputFormat, ThemeArg};
use crate::client::CliResult;
use crate::output::{PreferenceSummary, Renderer, print};

pub(crate) fn handle_prefs_show(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let summary = PreferenceSummary {
        theme: ctx.theme().as_str().to_string(),
        language: ctx.locale().label().to_string(),
        state_file: ctx
            .preferences()
            .location()
            .map(|path| path.display().to_string()),
    };
    print(Renderer::new(ctx, format).preferences(&summary))
}

pub(crate) fn handle_theme(ctx: &AppContext, mode: ThemeArg) -> CliResult<()> {
    let applied = match mode {
        ThemeArg::Light => {
            ctx.set_theme(ThemeMode::Light)?;
            ThemeMode::Light
        }
        ThemeArg::Dark => {
            ctx.set_theme(ThemeMode::Dark)?;
            ThemeMode::Dark
        }
        ThemeArg::Toggle => ctx.toggle_theme()?,
    };
    ctx.notifications().success(ctx.format(
        "prefs.theme_changed",
        "Theme set to {theme}",
        &[("theme", applied.as_str())],
    ));
    Ok(())
}

pub(crate) fn handle_language(ctx: &AppContext, language: LanguageArg) -> CliResult<()> {
    let locale = match language {
        LanguageArg::En => LocaleCode::En,
        LanguageArg::Zh => LocaleCode::Zh,
    };
    ctx.set_locale(locale)?;
    ctx.notifications()
        .success(ctx.text("prefs.language_changed", "Language set to English"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support;
    use anyhow::{Result, anyhow};

    #[tokio::test]
    async fn toggling_twice_restores_the_theme() -> Result<()> {
        let ctx = test_support::context("http://127.0.0.1:9")?;
        let start = ctx.theme();
        handle_theme(&ctx, ThemeArg::Toggle).map_err(|err| anyhow!(err.display_message()))?;
        assert_eq!(ctx.theme(), start.toggled());
        handle_theme(&ctx, ThemeArg::Toggle).map_err(|err| anyhow!(err.display_message()))?;
        assert_eq!(ctx.theme(), start);
        assert_eq!(ctx.preferences().stored_theme(), Some(start));
        Ok(())
    }

    #[tokio::test]
    async fn language_switch_announces_in_the_new_language() -> Result<()> {
        let ctx = test_support::context("http://127.0.0.1:9")?;
        handle_language(&ctx, LanguageArg::Zh).map_err(|err| anyhow!(err.display_message()))?;
        assert_eq!(ctx.locale(), LocaleCode::Zh);
        assert_eq!(
            test_support::shown(&ctx),
            vec!["语言已切换为中文".to_string()]
        );
        Ok(())
    }

    #[tokio::test]
    async fn explicit_theme_is_announced() -> Result<()> {
        let ctx = test_support::context("http://127.0.0.1:9")?;
        handle_theme(&ctx, ThemeArg::Dark).map_err(|err| anyhow!(err.display_message()))?;
        assert_eq!(ctx.theme(), ThemeMode::Dark);
        assert_eq!(test_support::shown(&ctx), vec!["Theme set to dark".to_string()]);
        handle_prefs_show(&ctx, OutputFormat::Json).map_err(|err| anyhow!(err.display_message()))?;
        Ok(())
    }
}
