//! Reply texts sent back to the chat user.

use bigdecimal::BigDecimal;
use std::fmt::Write;

use super::statistics::{Period, Statistics};
use crate::domain::{TransactionDraft, TransactionRecord};

pub const CURRENCY: &str = "VNĐ";
pub const USAGE_HINT: &str = "💡 Format: 'Chi 50k ăn trưa' hoặc 'Thu 5 triệu lương'";

const CATALOG_PREVIEW_LEN: usize = 10;
const TOP_CATEGORIES: usize = 5;

/// Whole-unit amount with `,` thousands separators, e.g. `1,250,000`.
pub fn format_amount(amount: &BigDecimal) -> String {
    let whole = amount.round(0).with_scale(0).to_string();
    let (sign, digits) = match whole.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", whole.as_str()),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{}", sign, grouped)
}

pub fn transaction_saved(record: &TransactionRecord) -> String {
    let mut reply = format!(
        "✅ Đã ghi nhận:\n• Loại: {}\n• Số tiền: {} {}\n• Danh mục: {}\n",
        record.kind,
        format_amount(&record.amount),
        CURRENCY,
        record.category
    );
    if !record.note.is_empty() {
        let _ = writeln!(reply, "• Ghi chú: {}", record.note);
    }
    reply
}

pub fn invalid_transaction(draft: &TransactionDraft, categories: &[String]) -> String {
    let preview: Vec<&str> = categories
        .iter()
        .take(CATALOG_PREVIEW_LEN)
        .map(String::as_str)
        .collect();

    format!(
        "❌ Thiếu thông tin: {}\n\n{}\n📋 Danh mục có sẵn: {}",
        draft.missing_fields().join(", "),
        USAGE_HINT,
        preview.join(", ")
    )
}

pub fn save_failed() -> String {
    "❌ Có lỗi xảy ra khi ghi dữ liệu. Vui lòng thử lại sau.".to_string()
}

pub fn statistics_failed() -> String {
    "❌ Không truy cập được dữ liệu để thống kê. Vui lòng thử lại sau.".to_string()
}

pub fn invalid_period(month: &str) -> String {
    format!(
        "❌ Tháng không hợp lệ: {}. Tháng phải từ 1 đến 12.\n💡 Ví dụ: 'thống kê tháng 3' hoặc 'thống kê 3/2024'",
        month
    )
}

pub fn statistics(stats: &Statistics, period: Period) -> String {
    let mut reply = String::from("📊 THỐNG KÊ THU CHI");
    match (period.month, period.year) {
        (Some(month), Some(year)) => {
            let _ = write!(reply, " - {}/{}", month, year);
        }
        (None, Some(year)) => {
            let _ = write!(reply, " - Năm {}", year);
        }
        (Some(month), None) => {
            let _ = write!(reply, " - Tháng {}", month);
        }
        (None, None) => {}
    }
    reply.push_str("\n\n");

    let _ = writeln!(reply, "💰 Tổng Thu: {} {}", format_amount(&stats.total_income), CURRENCY);
    let _ = writeln!(reply, "💸 Tổng Chi: {} {}", format_amount(&stats.total_expense), CURRENCY);
    let _ = writeln!(reply, "📈 Chênh lệch: {} {}", format_amount(&stats.balance()), CURRENCY);
    let _ = writeln!(reply, "📝 Số giao dịch: {}", stats.count);

    let top = stats.top_categories(TOP_CATEGORIES);
    if !top.is_empty() {
        reply.push_str("\n📋 Theo danh mục:\n");
        for (name, totals) in top {
            let _ = writeln!(
                reply,
                "• {}: Thu {} | Chi {}",
                name,
                format_amount(&totals.income),
                format_amount(&totals.expense)
            );
        }
    }

    reply
}
