//! Synthetic daily transactions for a month's target.
//!
//! Fixed costs (salary, rent reserve, fees, the fixed part of utilities) land
//! on their schedule; flexible spending comes from daily shopping baskets
//! steered towards the pro-rata target. A final calibration pass makes every
//! target category add up to its target exactly.

use std::ops::RangeInclusive;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde_json::{json, Number, Value};
use tracing::{debug, info};

use crate::error::{RekapError, Result};
use crate::models::{Period, Record, TargetRecord, AMOUNT_FIELD, SUB_CATEGORY_FIELD};
use crate::reports::checked_sum;
use crate::source::DataSource;

pub const DEFAULT_SEED: u64 = 42;

/// How hard flexible spending is pulled back towards the pro-rata target.
const SENSITIVITY: f64 = 0.2;

pub const SALARY: &str = "Operasional|Gaji Pegawai";
pub const MARKETING: &str = "Operasional|Marketing & Promosi";
pub const RENT_RESERVE: &str = "Operasional|Sewa Tempat (Cadangan)";
pub const DEPRECIATION: &str = "Operasional|Beban Penyusutan (Depresiasi)";
pub const COMMUNITY_FEES: &str = "Operasional|Iuran Lingkungan";
pub const UTILITIES: &str = "Operasional|Utilitas";
pub const MAINTENANCE: &str = "Operasional|Maintenance & Perlengkapan";
pub const MISCELLANEOUS: &str = "Operasional|Lain-lain";
pub const RAW_MATERIALS: &str = "Belanja Bahan Baku (COGS)";

const SALARY_DAY: u32 = 10;
const MONTHLY_FEE: i64 = 80_000;
const WEEKLY_WASTE_FEE: i64 = 20_000;
const WIFI_BILL: i64 = 425_000;

// ---------------------------------------------------------------------------
// Item master
// ---------------------------------------------------------------------------

struct Item {
    name: &'static str,
    mean: f64,
    std_dev: f64,
}

const fn item(name: &'static str, mean: f64, std_dev: f64) -> Item {
    Item { name, mean, std_dev }
}

const RAW_GOODS: &[Item] = &[
    item("susu", 22_000.0, 7_000.0),
    item("gula", 16_000.0, 4_000.0),
    item("kopi", 25_000.0, 10_000.0),
    item("telur", 28_000.0, 9_000.0),
    item("indomie", 3_500.0, 500.0),
    item("pasar", 175_000.0, 75_000.0),
    item("toko ibu", 150_000.0, 60_000.0),
    item("dampit", 40_000.0, 15_000.0),
    item("roti", 18_000.0, 5_000.0),
    item("es batu", 10_000.0, 2_000.0),
    item("air galon", 7_000.0, 1_000.0),
];

const SUPPORT_SUPPLIES: &[Item] = &[
    item("lpg", 23_000.0, 1_000.0),
    item("sabun", 15_000.0, 5_000.0),
    item("minyak", 28_000.0, 8_000.0),
    item("tisue", 12_000.0, 4_000.0),
    item("bensin", 15_000.0, 5_000.0),
];

const CONSUMABLES: &[Item] = &[
    item("baterai", 15_000.0, 5_000.0),
    item("pengharum ruangan", 30_000.0, 10_000.0),
    item("pupuk tanaman", 50_000.0, 15_000.0),
    item("makanan kucing", 25_000.0, 5_000.0),
    item("alat kebersihan", 20_000.0, 8_000.0),
    item("sponge cuci piring", 5_000.0, 2_000.0),
    item("sabun cuci piring", 15_000.0, 5_000.0),
    item("tissue toilet", 20_000.0, 8_000.0),
    item("perbaikan meja / kursi", 40_000.0, 10_000.0),
    item("pengadaan gelas pecah", 30_000.0, 20_000.0),
];

const EQUIPMENT: &[Item] = &[
    item("ember", 35_000.0, 10_000.0),
    item("gagang pel", 40_000.0, 15_000.0),
    item("sapu", 25_000.0, 8_000.0),
    item("perbaikan elektrikal", 65_000.0, 15_000.0),
    item("perbaikan kecil ruang", 80_000.0, 30_000.0),
];

const SUNDRIES: &[Item] = &[
    item("ATK", 25_000.0, 10_000.0),
    item("fotokopi", 15_000.0, 5_000.0),
    item("biaya tak terduga", 50_000.0, 25_000.0),
    item("bayar pengamen", 1_500.0, 500.0),
    item("sumbangan kecil", 10_000.0, 5_000.0),
    item("pembelian impulsif", 20_000.0, 10_000.0),
];

/// Item groups a basket draws from, with their weights.
type BasketMix = &'static [(&'static [Item], f64)];

const PANTRY_MIX: BasketMix = &[(RAW_GOODS, 0.85), (SUPPORT_SUPPLIES, 0.15)];
const MAINTENANCE_MIX: BasketMix = &[(CONSUMABLES, 0.9), (EQUIPMENT, 0.1)];
const SUNDRY_MIX: BasketMix = &[(SUNDRIES, 1.0)];

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Payday for `day` of the month, moved off the weekend: Sunday goes back to
/// Friday, Saturday forward to Monday. A day past the month's end becomes
/// the last working day.
pub fn payment_date(period: Period, day: u32) -> Result<NaiveDate> {
    if let Some(date) = NaiveDate::from_ymd_opt(period.year(), period.month(), day) {
        return Ok(match date.weekday() {
            Weekday::Sun => date - Duration::days(2),
            Weekday::Sat => date + Duration::days(2),
            _ => date,
        });
    }
    let last = last_day(period)?;
    Ok(match last.weekday() {
        Weekday::Sat => last - Duration::days(1),
        Weekday::Sun => last - Duration::days(2),
        _ => last,
    })
}

fn first_day(period: Period) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(period.year(), period.month(), 1)
        .ok_or_else(|| RekapError::invalid(format!("no such period: {period}")))
}

fn last_day(period: Period) -> Result<NaiveDate> {
    let first = first_day(period)?;
    let next = first
        .checked_add_months(chrono::Months::new(1))
        .ok_or_else(|| RekapError::invalid(format!("no month after {period}")))?;
    Ok(next - Duration::days(1))
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

struct Draft {
    id: usize,
    date: NaiveDate,
    main_category: &'static str,
    sub_category: String,
    description: String,
    amount: Decimal,
}

impl Draft {
    fn into_record(self) -> Record {
        let mut record = Record::new();
        record.insert("ID_Transaksi".into(), json!(format!("TXN{:04}", self.id)));
        record.insert(
            "Tanggal_Transaksi".into(),
            json!(self.date.format("%Y-%m-%d").to_string()),
        );
        record.insert("Bulan".into(), json!(self.date.month()));
        record.insert("PIC".into(), json!("SYSTEM"));
        record.insert("Kategori_Utama".into(), json!(self.main_category));
        record.insert(SUB_CATEGORY_FIELD.into(), json!(self.sub_category));
        record.insert("Keterangan".into(), json!(self.description));
        record.insert(AMOUNT_FIELD.into(), amount_value(self.amount));
        record
    }
}

fn amount_value(amount: Decimal) -> Value {
    let normalized = amount.normalize();
    if normalized.fract().is_zero() {
        if let Some(i) = normalized.to_i64() {
            return Value::Number(i.into());
        }
    }
    normalized
        .to_f64()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn whole(amount: f64) -> Decimal {
    Decimal::from_f64(amount.round()).unwrap_or_default()
}

/// Round to the nearest multiple of `step`.
fn round_to(amount: f64, step: f64) -> Decimal {
    whole((amount / step).round() * step)
}

/// Box-Muller draw from a normal distribution.
fn normal(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    mean + std_dev * (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// A flexible category the daily loop steers towards its target.
struct Flexible {
    key: &'static str,
    target: f64,
    spent: f64,
}

impl Flexible {
    /// >1 when behind the pro-rata target, <1 when ahead; clamped to [0.1, 2].
    fn adjustment(&self, day: u32, days_in_month: u32) -> f64 {
        let pro_rata = self.target / f64::from(days_in_month) * f64::from(day);
        let discrepancy = pro_rata - self.spent;
        (1.0 + discrepancy / (pro_rata + 1e-6) * SENSITIVITY).clamp(0.1, 2.0)
    }
}

struct Generator<'a> {
    target: &'a TargetRecord,
    rng: StdRng,
    drafts: Vec<Draft>,
}

impl<'a> Generator<'a> {
    fn amount(&self, key: &str) -> Result<Option<Decimal>> {
        Ok(self
            .target
            .categories()?
            .into_iter()
            .find(|(k, _)| *k == key)
            .map(|(_, amount)| amount))
    }

    fn push(
        &mut self,
        date: NaiveDate,
        main_category: &'static str,
        sub_category: &str,
        amount: Decimal,
        description: impl Into<String>,
    ) {
        self.drafts.push(Draft {
            id: self.drafts.len() + 1,
            date,
            main_category,
            sub_category: sub_category.to_string(),
            description: description.into(),
            amount,
        });
    }

    fn day_in(&mut self, period: Period, days: RangeInclusive<u32>) -> Result<NaiveDate> {
        let day = self.rng.gen_range(days);
        NaiveDate::from_ymd_opt(period.year(), period.month(), day)
            .ok_or_else(|| RekapError::invalid(format!("no day {day} in {period}")))
    }

    /// Scheduled costs. Returns what is left of the utilities target for
    /// electricity once the fixed bills are in.
    fn fixed(&mut self, period: Period) -> Result<f64> {
        let first = first_day(period)?;
        let last = last_day(period)?;

        if let Some(amount) = self.amount(SALARY)? {
            let month_name = first.format("%B").to_string();
            self.push(
                payment_date(period, SALARY_DAY)?,
                "Operasional",
                SALARY,
                amount,
                format!("Gaji Pegawai {month_name}"),
            );
        }
        if let Some(amount) = self.amount(MARKETING)? {
            let date = self.day_in(period, 1..=5)?;
            self.push(date, "Operasional", MARKETING, amount, "Budget Promosi & Pemasaran");
        }
        if let Some(amount) = self.amount(RENT_RESERVE)? {
            self.push(first, "Operasional", RENT_RESERVE, amount, "Alokasi Dana Cadangan Sewa");
        }
        if let Some(amount) = self.amount(DEPRECIATION)? {
            let date = self.day_in(period, 1..=5)?;
            self.push(date, "Operasional", DEPRECIATION, amount, "Pencatatan Beban Penyusutan");
        }
        if self.amount(COMMUNITY_FEES)?.is_some() {
            let date = self.day_in(period, 1..=5)?;
            self.push(
                date,
                "Operasional",
                COMMUNITY_FEES,
                Decimal::from(MONTHLY_FEE),
                "Pembayaran Iuran Warga Bulanan",
            );
            for date in first.iter_days().take_while(|d| *d <= last) {
                if date.weekday() == Weekday::Sat {
                    self.push(
                        date,
                        "Operasional",
                        COMMUNITY_FEES,
                        Decimal::from(WEEKLY_WASTE_FEE),
                        "Pembayaran Uang Sampah Mingguan",
                    );
                }
            }
        }

        let Some(utilities) = self.amount(UTILITIES)? else {
            return Ok(0.0);
        };
        let water = whole(self.rng.gen_range(500_000.0..620_000.0));
        let wifi_date = self.day_in(period, 15..=20)?;
        let water_date = self.day_in(period, 15..=20)?;
        self.push(
            wifi_date,
            "Operasional",
            UTILITIES,
            Decimal::from(WIFI_BILL),
            "Pembayaran Tagihan WIFI Bulanan",
        );
        self.push(water_date, "Operasional", UTILITIES, water, "Pembayaran Tagihan Air PDAM");

        let remaining = utilities.to_f64().unwrap_or_default()
            - WIFI_BILL as f64
            - water.to_f64().unwrap_or_default();
        Ok(remaining.max(0.0))
    }

    /// Items joined by `/`, total rounded to the nearest 100.
    fn basket(
        &mut self,
        mix: BasketMix,
        base_items: u32,
        adjustment: f64,
    ) -> Result<(String, Decimal)> {
        let weights = WeightedIndex::new(mix.iter().map(|(_, w)| *w))
            .map_err(|e| RekapError::Other(format!("basket weights: {e}")))?;
        let count = ((f64::from(base_items) * adjustment).round() as u32).max(1);

        let mut names = Vec::with_capacity(count as usize);
        let mut total = 0.0;
        for _ in 0..count {
            let (items, _) = mix[weights.sample(&mut self.rng)];
            let Some(item) = items.choose(&mut self.rng) else {
                continue;
            };
            total += normal(&mut self.rng, item.mean, item.std_dev).max(0.0);
            names.push(item.name);
        }
        Ok((names.join("/"), round_to(total, 100.0)))
    }

    fn daily(&mut self, period: Period, electricity: f64) -> Result<()> {
        let first = first_day(period)?;
        let last = last_day(period)?;
        let days_in_month = last.day();

        let mut flexible: Vec<Flexible> = Vec::new();
        for key in [RAW_MATERIALS, MAINTENANCE, MISCELLANEOUS] {
            if let Some(target) = self.amount(key)? {
                flexible.push(Flexible {
                    key,
                    target: target.to_f64().unwrap_or_default(),
                    spent: 0.0,
                });
            }
        }
        let mut power = self.amount(UTILITIES)?.map(|_| Flexible {
            key: UTILITIES,
            target: electricity,
            spent: 0.0,
        });

        for date in first.iter_days().take_while(|d| *d <= last) {
            let day = date.day();
            for flex in flexible.iter_mut() {
                let (chance, mix, base_items) = match flex.key {
                    RAW_MATERIALS => (0.95, PANTRY_MIX, self.rng.gen_range(4..=8)),
                    MAINTENANCE => (2.0 / 7.0, MAINTENANCE_MIX, self.rng.gen_range(1..=2)),
                    _ => (0.1, SUNDRY_MIX, 1),
                };
                if !self.rng.gen_bool(chance) {
                    continue;
                }
                let adjustment = flex.adjustment(day, days_in_month);
                let (description, amount) = self.basket(mix, base_items, adjustment)?;
                if amount.is_sign_positive() && !amount.is_zero() {
                    let main = if flex.key == RAW_MATERIALS { "Bahan Baku" } else { "Operasional" };
                    self.push(date, main, flex.key, amount, description);
                    flex.spent += amount.to_f64().unwrap_or_default();
                }
            }

            if let Some(power) = power.as_mut() {
                if self.rng.gen_bool(2.0 / 7.0) {
                    let token = self.rng.gen_range(50_000.0..150_000.0);
                    let amount = round_to(token * power.adjustment(day, days_in_month), 1_000.0);
                    if !amount.is_zero() {
                        self.push(date, "Operasional", UTILITIES, amount, "Pembelian Token Listrik");
                        power.spent += amount.to_f64().unwrap_or_default();
                    }
                }
            }
        }
        Ok(())
    }

    /// Move each category's sum onto its target, largest transactions first,
    /// never below zero. A positive target with no transactions gets a single
    /// adjustment entry on the month's last day.
    fn calibrate(&mut self, period: Period) -> Result<()> {
        let last = last_day(period)?;
        let record = self.target;
        for (key, target) in record.categories()? {
            let mut indices: Vec<usize> = self
                .drafts
                .iter()
                .enumerate()
                .filter(|(_, d)| d.sub_category == key)
                .map(|(ix, _)| ix)
                .collect();

            if indices.is_empty() {
                if !target.is_zero() {
                    self.push(last, "Operasional", key, target, "Penyesuaian Akhir Bulan");
                }
                continue;
            }

            let actual = checked_sum(indices.iter().map(|&ix| self.drafts[ix].amount), key)?;
            let mut remaining = target.checked_sub(actual).ok_or_else(|| {
                RekapError::invalid(format!("amount overflow calibrating '{key}'"))
            })?;
            if remaining.is_zero() {
                continue;
            }
            debug!("Calibrating '{key}' by {remaining}");

            indices.sort_by(|a, b| self.drafts[*b].amount.cmp(&self.drafts[*a].amount));
            for ix in indices {
                let draft = &mut self.drafts[ix];
                let adjusted = checked_sum([draft.amount, remaining], key)?.max(Decimal::ZERO);
                remaining -= adjusted - draft.amount;
                draft.amount = adjusted;
                if remaining.is_zero() {
                    break;
                }
            }
        }
        Ok(())
    }
}

/// Transactions for `target`'s month. The same seed always yields the same
/// list; each target category sums exactly to its target.
pub fn generate_transactions(target: &TargetRecord, seed: u64) -> Result<Vec<Record>> {
    let period = target.period()?;
    info!("Generating transactions for {period} (seed {seed})");

    let mut generator = Generator {
        target,
        rng: StdRng::seed_from_u64(seed),
        drafts: Vec::new(),
    };
    let electricity = generator.fixed(period)?;
    debug!("Electricity budget after fixed bills: {electricity:.0}");
    generator.daily(period, electricity)?;
    generator.calibrate(period)?;

    let mut drafts = generator.drafts;
    drafts.sort_by_key(|d| d.date);
    info!("Generated {} transactions", drafts.len());
    Ok(drafts.into_iter().map(Draft::into_record).collect())
}

/// Targets come from `inner`; transactions are generated from the target.
#[derive(Debug, Clone)]
pub struct GeneratorSource<S> {
    inner: S,
    seed: u64,
}

impl<S: DataSource> GeneratorSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl<S: DataSource> DataSource for GeneratorSource<S> {
    fn fetch_target(&self, period: Period) -> Result<TargetRecord> {
        self.inner.fetch_target(period)
    }

    fn fetch_transactions(&self, target: &TargetRecord) -> Result<Vec<Record>> {
        generate_transactions(target, self.seed)
    }
}
