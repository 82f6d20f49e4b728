//! Server-rendered pages. Every interpolated value goes through `escape`.

use axum::response::Html;

use crate::health::classify::{Spo2Result, WeightBloodResult};

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="id">
<head>
<meta charset="utf-8">
<title>{title}</title>
<link rel="stylesheet" href="/style.css">
</head>
<body>
{body}
</body>
</html>"#,
        title = escape(title),
    ))
}

fn error_list(errors: &[String]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let items: String = errors
        .iter()
        .map(|e| format!("<li>{}</li>", escape(e)))
        .collect();
    format!(r#"<ul class="errors">{items}</ul>"#)
}

pub fn index() -> Html<String> {
    page(
        "Health Check",
        r#"<h1>Health Check</h1>
<nav>
<a href="/login">Login</a> | <a href="/register">Register</a> |
<a href="/check-weight-blood">Cek Berat &amp; Tekanan Darah</a> |
<a href="/check-spo2">Cek SpO2</a>
</nav>"#,
    )
}

pub fn login(errors: &[String]) -> Html<String> {
    page(
        "Login",
        &format!(
            r#"<h1>Login</h1>
{errors}
<form method="post" action="/login">
<input type="email" name="email" placeholder="Email" required>
<input type="password" name="password" placeholder="Password" required>
<button type="submit">Login</button>
</form>
<p><a href="/register">Belum punya akun? Daftar</a></p>"#,
            errors = error_list(errors),
        ),
    )
}

pub fn register(errors: &[String]) -> Html<String> {
    page(
        "Register",
        &format!(
            r#"<h1>Register</h1>
{errors}
<form method="post" action="/register">
<input type="text" name="name" placeholder="Nama" required>
<input type="email" name="email" placeholder="Email" required>
<input type="password" name="password" placeholder="Password" required>
<input type="password" name="confirm_password" placeholder="Konfirmasi Password" required>
<button type="submit">Daftar</button>
</form>
<p><a href="/login">Sudah punya akun? Login</a></p>"#,
            errors = error_list(errors),
        ),
    )
}

pub fn home(user_name: &str) -> Html<String> {
    page(
        "Halaman Utama",
        &format!(
            r#"<h1>Selamat datang, {name}</h1>
<nav>
<a href="/check-weight-blood">Cek Berat &amp; Tekanan Darah</a> |
<a href="/check-spo2">Cek SpO2</a> |
<a href="/logout">Logout</a>
</nav>"#,
            name = escape(user_name),
        ),
    )
}

pub fn weight_blood_form(errors: &[String]) -> Html<String> {
    page(
        "Cek Berat Badan & Tekanan Darah",
        &format!(
            r#"<h1>Cek Berat Badan &amp; Tekanan Darah</h1>
{errors}
<form method="post" action="/check-weight-blood">
<input type="text" name="name" placeholder="Nama" required>
<input type="number" name="age" placeholder="Umur" required>
<input type="number" step="any" name="height" placeholder="Tinggi (cm)" required>
<input type="number" step="any" name="weight" placeholder="Berat (kg)" required>
<input type="number" step="any" name="systolic" placeholder="Sistolik" required>
<input type="number" step="any" name="diastolic" placeholder="Diastolik" required>
<button type="submit">Cek</button>
</form>"#,
            errors = error_list(errors),
        ),
    )
}

pub fn weight_blood_result(name: &str, systolic: f64, diastolic: f64, r: &WeightBloodResult) -> Html<String> {
    page(
        "Hasil Cek Berat Badan & Tekanan Darah",
        &format!(
            r#"<h1>Hasil untuk {name}</h1>
<p>BMI: <strong>{bmi:.2}</strong> ({weight})</p>
<p>Tekanan darah: {systolic}/{diastolic} mmHg ({blood})</p>
<p><a href="/check-weight-blood">Cek lagi</a></p>"#,
            name = escape(name),
            bmi = r.bmi,
            weight = r.weight_category,
            blood = r.blood_category,
        ),
    )
}

pub fn spo2_form(errors: &[String]) -> Html<String> {
    page(
        "Cek SpO2",
        &format!(
            r#"<h1>Cek SpO2</h1>
{errors}
<form method="post" action="/check-spo2">
<input type="text" name="name" placeholder="Nama" required>
<input type="number" name="age" placeholder="Umur" required>
<input type="number" step="any" name="spo2" placeholder="SpO2 (%)" required>
<button type="submit">Cek</button>
</form>"#,
            errors = error_list(errors),
        ),
    )
}

pub fn spo2_result(name: &str, spo2: f64, r: &Spo2Result) -> Html<String> {
    page(
        "Hasil Cek SpO2",
        &format!(
            r#"<h1>Hasil untuk {name}</h1>
<p>SpO2: {spo2}% ({category})</p>
<p><a href="/check-spo2">Cek lagi</a></p>"#,
            name = escape(name),
            category = r.spo2_category,
        ),
    )
}

pub fn system_error(message: &str) -> Html<String> {
    page(
        "Error",
        &format!("<h1>{}</h1>", escape(message)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<script>alert("x&y")</script>"#),
            "&lt;script&gt;alert(&quot;x&amp;y&quot;)&lt;/script&gt;"
        );
    }

    #[test]
    fn form_errors_are_listed_and_escaped() {
        let Html(body) = login(&["<b>bad</b>".to_string()]);
        assert!(body.contains(r#"<ul class="errors"><li>&lt;b&gt;bad&lt;/b&gt;</li></ul>"#));
        let Html(body) = register(&[]);
        assert!(!body.contains("errors"));
    }
}
