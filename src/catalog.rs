//! Static catalog of research capabilities, their frameworks, and the
//! per-framework defaults the CLI applies when the user doesn't override the
//! modifiers. Pure data; no temporal logic lives here.

use crate::job::types::Modifiers;

/// Capability groups and the frameworks they offer.
pub const CAPABILITIES: &[(&str, &[&str])] = &[
    (
        "Traditional Analysis",
        &[
            "General Analysis",
            "Margin & Return Metrics",
            "Debt & Liquidity Assessment",
            "Porter's Five Forces",
            "SWOT Analysis",
            "DCF Valuation",
            "TAM/SAM/SOM Analysis",
            "Competitive Benchmarking",
        ],
    ),
    (
        "Advanced Research - Ecosystem",
        &[
            "Ecosystem Mapping",
            "Supply Chain Contagion Modeling",
            "Capital Flow Mapping",
        ],
    ),
    (
        "Advanced Research - Narrative",
        &[
            "Narrative Momentum Analysis",
            "Competitive Response Patterns",
            "Management Quality Assessment",
        ],
    ),
    (
        "Advanced Research - Comparative",
        &[
            "Multistock Time Series Analysis",
            "Cross-Sector Value Migration",
            "Technology Adoption Curves",
        ],
    ),
    (
        "Advanced Research - Scenario",
        &[
            "Risk Correlation Study",
            "Downside Scenario Modeling",
            "Market Entry Strategy Analysis",
        ],
    ),
    (
        "Advanced Research - Intelligence",
        &[
            "Talent Landscape Mapping",
            "Alliance & Partnership History",
            "Industry Trend Analysis",
        ],
    ),
    ("Custom Research", &["Custom Framework"]),
];

/// Frameworks available under a capability, if the capability exists.
pub fn frameworks_for(capability: &str) -> Option<&'static [&'static str]> {
    CAPABILITIES
        .iter()
        .find(|(name, _)| *name == capability)
        .map(|(_, frameworks)| *frameworks)
}

/// Whether a (capability, framework) pair is in the catalog.
pub fn is_valid_pair(capability: &str, framework: &str) -> bool {
    frameworks_for(capability).is_some_and(|frameworks| frameworks.contains(&framework))
}

/// Free-text hint shown for a framework's context field.
pub fn context_hint(framework: &str) -> &'static str {
    match framework {
        "General Analysis" => {
            "Enter company or topic for comprehensive analysis (e.g., NVIDIA, semiconductor industry)"
        }
        "Margin & Return Metrics" => {
            "Enter company for profitability analysis (e.g., NVIDIA margins, Microsoft ROIC, Apple ROE)"
        }
        "Debt & Liquidity Assessment" => {
            "Enter company for balance sheet health (e.g., AT&T debt load, Tesla liquidity, Boeing solvency)"
        }
        "Porter's Five Forces" => {
            "Enter company/industry (e.g., Tesla in EV market, Netflix in streaming)"
        }
        "SWOT Analysis" => {
            "Enter company for strengths, weaknesses, opportunities, threats (e.g., Apple, Microsoft)"
        }
        "DCF Valuation" => {
            "Enter company for discounted cash flow valuation (e.g., NVDA, GOOGL, TSLA)"
        }
        "TAM/SAM/SOM Analysis" => {
            "Enter market for addressable market sizing (e.g., AI chips, electric vehicles, cloud gaming)"
        }
        "Competitive Benchmarking" => "Enter companies for peer comparison (e.g., NVDA vs AMD vs INTC)",
        "Ecosystem Mapping" => {
            "Enter company to map suppliers, partners, competitors, dependencies (e.g., Apple, Tesla)"
        }
        "Supply Chain Contagion Modeling" => {
            "Describe disruption scenario (e.g., Taiwan semiconductor shutdown, China rare earth embargo)"
        }
        "Capital Flow Mapping" => {
            "Enter entities to track investment flows (e.g., SoftBank portfolio, Sequoia investments)"
        }
        "Narrative Momentum Analysis" => {
            "Enter narrative theme and companies (e.g., AI leader narrative: NVDA, GOOGL, MSFT, META)"
        }
        "Competitive Response Patterns" => {
            "Enter companies for historical competitive behavior (e.g., Amazon vs Walmart over 10 years)"
        }
        "Management Quality Assessment" => {
            "Enter company to evaluate leadership effectiveness (e.g., Microsoft under Nadella, Apple post-Jobs)"
        }
        "Multistock Time Series Analysis" => {
            "Enter 2-3 stocks with timeframe (e.g., NVDA, AMD, INTC from 2020-2025)"
        }
        "Cross-Sector Value Migration" => {
            "Enter sectors to track value shifts (e.g., automotive to software to AI)"
        }
        "Technology Adoption Curves" => {
            "Enter technology and sectors (e.g., AI adoption: healthcare vs finance vs manufacturing)"
        }
        "Risk Correlation Study" => {
            "Enter companies to map interconnected risks (e.g., oil prices impact on airlines, shipping, retail)"
        }
        "Downside Scenario Modeling" => {
            "Enter company and risk scenario (e.g., Intel loses 30% market share to ARM)"
        }
        "Market Entry Strategy Analysis" => {
            "Enter company and new market (e.g., Walmart enters India, Tesla expansion in Europe)"
        }
        "Talent Landscape Mapping" => {
            "Enter industry for workforce analysis (e.g., semiconductor engineers, AI researchers, biotech scientists)"
        }
        "Alliance & Partnership History" => {
            "Enter company to map past partnerships and predict future alliances (e.g., Microsoft, Starbucks)"
        }
        "Industry Trend Analysis" => {
            "Enter industry and timeframe (e.g., renewable energy 2020-2030, semiconductor cycles)"
        }
        "Custom Framework" => {
            "Describe your research question or analytical approach in detail. Be as specific as possible."
        }
        _ => "Describe your research needs in detail...",
    }
}

/// Modifier defaults a framework pre-selects. Frameworks without their own
/// entry use the general default.
pub fn default_modifiers(framework: &str) -> Modifiers {
    let (scope, depth, rigor, perspective) = match framework {
        "DCF Valuation" => ("Assets", "Comprehensive", "Exhaustive Research", "Investment"),
        "General Analysis" => ("Assets", "Comprehensive", "Detailed Analysis", "Investment"),
        "TAM/SAM/SOM Analysis" => ("Market", "Focused", "Detailed Analysis", "Investment"),
        "Supply Chain Contagion Modeling" => {
            ("Market", "Comprehensive", "Exhaustive Research", "Technical")
        }
        "Multistock Time Series Analysis" => {
            ("Assets", "Comprehensive", "Detailed Analysis", "Investment")
        }
        "Cross-Sector Value Migration" => {
            ("Sector", "Comprehensive", "Detailed Analysis", "Educational")
        }
        _ => ("Assets", "Comprehensive", "Detailed Analysis", "Investment"),
    };
    Modifiers {
        scope: scope.to_string(),
        depth: depth.to_string(),
        rigor: rigor.to_string(),
        perspective: perspective.to_string(),
    }
}
