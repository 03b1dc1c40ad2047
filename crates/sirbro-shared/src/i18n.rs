//! Supported locales and their page dictionaries.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    Pt,
    Es,
}

impl Locale {
    pub const ALL: [Locale; 3] = [Locale::En, Locale::Pt, Locale::Es];
    pub const DEFAULT: Locale = Locale::En;

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Pt => "pt",
            Locale::Es => "es",
        }
    }

    /// Exact match on the lowercase code, as it appears in URL paths.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_str() == code)
    }

    pub fn dictionary(&self) -> &'static Dictionary {
        match self {
            Locale::En => &EN,
            Locale::Pt => &PT,
            Locale::Es => &ES,
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the first supported language of an `Accept-Language` header.
///
/// Only the primary subtag is compared (`pt-BR` matches `pt`); the header's
/// order is trusted and q-values are not re-sorted.
pub fn detect_locale(accept_language: Option<&str>) -> Locale {
    accept_language
        .into_iter()
        .flat_map(|header| header.split(','))
        .filter_map(|tag| {
            let lang = tag.split(';').next()?.trim();
            let primary = lang.split('-').next()?.to_ascii_lowercase();
            Locale::from_code(&primary)
        })
        .next()
        .unwrap_or(Locale::DEFAULT)
}

#[derive(Debug, Serialize)]
pub struct Dictionary {
    pub hero: Hero,
    pub download: Download,
    pub footer: Footer,
    #[serde(rename = "deepLink")]
    pub deep_link: DeepLinkStrings,
}

#[derive(Debug, Serialize)]
pub struct Hero {
    pub title: &'static str,
    pub subtitle: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Download {
    pub title: &'static str,
    pub google: &'static str,
    pub apple: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Footer {
    pub company: &'static str,
    pub support: &'static str,
    pub copyright: &'static str,
    pub privacy: &'static str,
    pub terms: &'static str,
    pub disclaimer: &'static str,
    pub cookies: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepLinkStrings {
    pub invalid_link: &'static str,
    pub missing_channel_id: &'static str,
    pub go_to_homepage: &'static str,
    pub opening_app: &'static str,
    pub app_will_open: &'static str,
    pub preparing_app: &'static str,
    pub join_channel: &'static str,
    pub invited_to_join: &'static str,
    pub open_app: &'static str,
    pub dont_have_app: &'static str,
    pub channel_id: &'static str,
    pub invalid: &'static str,
}

static EN: Dictionary = Dictionary {
    hero: Hero {
        title: "SIR, it's your go-to BRO for football predictions.",
        subtitle: "Safe & risky tips, stats breakdowns, player form, match picks, and smart strategies, all in one place.",
    },
    download: Download {
        title: "Get SirBro",
        google: "Download on Google Play",
        apple: "Download on the App Store",
    },
    footer: Footer {
        company: "Levantem AI LTD, Gladstonos 116, M.Kyprianou House, 3&4th floor, 3032, Limassol, Cyprus",
        support: "support@levantemai.pro",
        copyright: "© 2025 SirBro. For users 18+ only.",
        privacy: "Privacy Policy",
        terms: "Terms of Service",
        disclaimer: "Disclaimer",
        cookies: "Cookie Notice",
    },
    deep_link: DeepLinkStrings {
        invalid_link: "Invalid Invitation Link",
        missing_channel_id: "This invitation link is missing the channel ID. Please check the link and try again.",
        go_to_homepage: "Go to Homepage",
        opening_app: "Opening TipsterBro...",
        app_will_open: "If the app doesn't open, you'll be redirected to the app store.",
        preparing_app: "Preparing to open the app...",
        join_channel: "Join SirBro Channel",
        invited_to_join: "You've been invited to join a channel on TipsterBro",
        open_app: "Open SirBro App",
        dont_have_app: "Don't have the app?",
        channel_id: "Channel ID",
        invalid: "Invalid",
    },
};

static PT: Dictionary = Dictionary {
    hero: Hero {
        title: "SIR, é o seu BRO ideal para previsões de futebol.",
        subtitle: "Dicas seguras e arriscadas, análises estatísticas, forma dos jogadores, escolhas de partidas e estratégias inteligentes, tudo em um só lugar.",
    },
    download: Download {
        title: "Baixe o SirBro",
        google: "Baixar no Google Play",
        apple: "Baixar na App Store",
    },
    footer: Footer {
        company: "Levantem AI LTD, Gladstonos 116, M.Kyprianou House, 3&4º andar, 3032, Limassol, Chipre",
        support: "support@levantemai.pro",
        copyright: "© 2025 SirBro. Apenas para usuários maiores de 18 anos.",
        privacy: "Política de Privacidade",
        terms: "Termos de Serviço",
        disclaimer: "Isenção de Responsabilidade",
        cookies: "Aviso de Cookies",
    },
    deep_link: DeepLinkStrings {
        invalid_link: "Link de Convite Inválido",
        missing_channel_id: "Este link de convite está sem o ID do canal. Por favor, verifique o link e tente novamente.",
        go_to_homepage: "Ir para a Página Inicial",
        opening_app: "Abrindo TipsterBro...",
        app_will_open: "Se o aplicativo não abrir, você será redirecionado para a loja de aplicativos.",
        preparing_app: "Preparando para abrir o aplicativo...",
        join_channel: "Entrar no Canal SirBro",
        invited_to_join: "Você foi convidado para entrar em um canal no TipsterBro",
        open_app: "Abrir Aplicativo SirBro",
        dont_have_app: "Não tem o aplicativo?",
        channel_id: "ID do Canal",
        invalid: "Inválido",
    },
};

static ES: Dictionary = Dictionary {
    hero: Hero {
        title: "SIR, es tu BRO ideal para predicciones de fútbol.",
        subtitle: "Consejos seguros y arriesgados, análisis estadísticos, forma de jugadores, selección de partidos y estrategias inteligentes, todo en un solo lugar.",
    },
    download: Download {
        title: "Obtén SirBro",
        google: "Descargar en Google Play",
        apple: "Descargar en App Store",
    },
    footer: Footer {
        company: "Levantem AI LTD, Gladstonos 116, M.Kyprianou House, 3º y 4º piso, 3032, Limassol, Chipre",
        support: "support@levantemai.pro",
        copyright: "© 2025 SirBro. Solo para usuarios mayores de 18 años.",
        privacy: "Política de Privacidad",
        terms: "Términos de Servicio",
        disclaimer: "Descargo de Responsabilidad",
        cookies: "Aviso de Cookies",
    },
    deep_link: DeepLinkStrings {
        invalid_link: "Enlace de Invitación Inválido",
        missing_channel_id: "Este enlace de invitación no tiene el ID del canal. Por favor, verifica el enlace e intenta de nuevo.",
        go_to_homepage: "Ir a la Página Principal",
        opening_app: "Abriendo TipsterBro...",
        app_will_open: "Si la aplicación no se abre, serás redirigido a la tienda de aplicaciones.",
        preparing_app: "Preparando para abrir la aplicación...",
        join_channel: "Unirse al Canal SirBro",
        invited_to_join: "Has sido invitado a unirte a un canal en TipsterBro",
        open_app: "Abrir Aplicación SirBro",
        dont_have_app: "¿No tienes la aplicación?",
        channel_id: "ID del Canal",
        invalid: "Inválido",
    },
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_locale_first_supported_wins() {
        assert_eq!(detect_locale(Some("pt-BR,pt;q=0.9,en;q=0.8")), Locale::Pt);
        assert_eq!(detect_locale(Some("de-DE, es-ES;q=0.7")), Locale::Es);
        assert_eq!(detect_locale(Some("EN-gb")), Locale::En);
    }

    #[test]
    fn test_detect_locale_defaults_to_english() {
        assert_eq!(detect_locale(None), Locale::En);
        assert_eq!(detect_locale(Some("")), Locale::En);
        assert_eq!(detect_locale(Some("fr-FR,de")), Locale::En);
        assert_eq!(detect_locale(Some("*")), Locale::En);
    }

    #[test]
    fn test_from_code() {
        assert_eq!(Locale::from_code("es"), Some(Locale::Es));
        assert_eq!(Locale::from_code("PT"), None);
        assert_eq!(Locale::from_code("fr"), None);
    }

    #[test]
    fn test_dictionaries_are_localized() {
        assert_eq!(Locale::En.dictionary().deep_link.invalid, "Invalid");
        assert_eq!(Locale::Pt.dictionary().deep_link.invalid, "Inválido");
        assert_ne!(
            Locale::Es.dictionary().deep_link.open_app,
            Locale::En.dictionary().deep_link.open_app
        );
    }
}
