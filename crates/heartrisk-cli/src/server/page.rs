//! Server-rendered index page. The form fields themselves are built by
//! `/static/script.js`.
use maud::{html, Markup, PreEscaped, DOCTYPE};

const STYLE: &str = "
body {
    font-family: system-ui, -apple-system, 'Segoe UI', sans-serif;
    background-color: #f4f6fb;
    color: #1f2933;
    margin: 0;
}
.container { max-width: 880px; margin: 40px auto; padding: 0 20px; }
.panel {
    background-color: #ffffff;
    border-radius: 12px;
    padding: 24px;
    box-shadow: 0 4px 18px rgba(15, 23, 42, 0.08);
    margin-bottom: 20px;
}
.grid-two-col { display: grid; grid-template-columns: repeat(2, minmax(0, 1fr)); gap: 16px; }
.field { display: flex; flex-direction: column; gap: 4px; }
.field input { padding: 8px 10px; border: 1px solid #cbd2e1; border-radius: 6px; }
.field small { color: #6b7280; }
button { margin-top: 20px; padding: 10px 18px; border: none; border-radius: 6px;
         background-color: #b91c1c; color: #ffffff; font-weight: 600; cursor: pointer; }
.error-banner { display: none; }
.error-banner--visible { display: block; background-color: #fee2e2; color: #991b1b;
                         padding: 12px 16px; border-radius: 8px; margin-bottom: 20px; }
.result-card { display: none; }
.result-card--visible { display: block; }
.result-card__header { display: flex; justify-content: space-between; align-items: center; }
.result-card__title { font-size: 1.2rem; font-weight: 600; }
.result-card__sub { color: #6b7280; }
.result-card__probability { font-size: 2.4rem; font-weight: 700; margin: 12px 0 4px; }
.result-card__meta { margin-top: 16px; font-size: 0.9rem; color: #4b5563; }
.result-pill { padding: 4px 12px; border-radius: 999px; font-weight: 600; }
.result-pill--low { background-color: #dcfce7; color: #166534; }
.result-pill--moderate { background-color: #fef9c3; color: #854d0e; }
.result-pill--high { background-color: #fee2e2; color: #991b1b; }
";

pub fn index() -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "Heart Disease Risk Assessment" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                div class="container" {
                    div class="panel" {
                        h1 { "Heart Disease Risk Assessment" }
                        p {
                            "Enter the patient's clinical measurements to estimate the probability "
                            "of heart disease with the trained logistic regression model."
                        }
                    }
                    div id="error-banner" class="error-banner" {}
                    div class="panel" {
                        div id="form" {}
                        button id="analyze-button" type="button" { "Analyze risk" }
                    }
                    div id="result" class="result-card panel" {}
                }
                script src="/static/script.js" {}
            }
        }
    }
}
