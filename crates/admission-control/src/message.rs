//! 거부 메시지 렌더링

use std::fmt::Write;

use kubeward_core::types::Alert;

/// break-glass 어노테이션 키
pub const BREAK_GLASS_ANNOTATION: &str = "admission.stackrox.io/break-glass";

fn write_field(out: &mut String, title: &str, value: &str) {
    if value.trim().is_empty() {
        return;
    }
    let _ = writeln!(out, "- {title}:");
    for line in value.lines() {
        let _ = writeln!(out, "    ↳ {line}");
    }
}

/// 알림 목록으로 거부 메시지를 만듭니다.
///
/// `include_bypass_hint`가 참이면 break-glass 안내를 덧붙입니다.
pub fn render_rejection(alerts: &[Alert], include_bypass_hint: bool) -> String {
    let mut out = String::new();
    let noun = if alerts.len() == 1 { "policy" } else { "policies" };
    let _ = writeln!(
        out,
        "The attempted operation violated {} enforced {noun}, described below:",
        alerts.len()
    );

    for alert in alerts {
        let policy = &alert.policy;
        let _ = writeln!(out);
        let _ = writeln!(out, "Policy: {}", policy.name);
        write_field(&mut out, "Description", &policy.description);
        write_field(&mut out, "Rationale", &policy.rationale);
        write_field(&mut out, "Remediation", &policy.remediation);
        if !alert.violations.is_empty() {
            let _ = writeln!(out, "- Violations:");
            for violation in &alert.violations {
                let _ = writeln!(out, "    - {}", violation.message);
            }
        }
    }

    if include_bypass_hint {
        let _ = writeln!(out);
        let _ = write!(
            out,
            "In case of emergency, add the annotation {{\"{BREAK_GLASS_ANNOTATION}\": \"ticket-1234\"}} \
             to your deployment with an updated ticket number"
        );
    }
    out.trim_end().to_owned()
}
