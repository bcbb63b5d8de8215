//! The payslip record: one employee's pay-period snapshot.
//!
//! Records are immutable once built. Totals are never taken from input:
//! [`PayslipRecord::total_earnings`], [`PayslipRecord::total_deductions`] and
//! [`PayslipRecord::net_pay`] are computed from the component amounts when the record is built.
//! Building fails with [`AmountOverflow`] when a sum does not fit in a [`Decimal`].

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Format used whenever a pay date is printed.
pub const PAY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Pay-period and employer fields shared by every record in a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeriodFields {
    pay_date: NaiveDate,
    working_days: u32,
    company_name: String,
    company_address: String,
}

impl PeriodFields {
    /// Creates the shared period fields.
    pub fn new(
        pay_date: NaiveDate,
        working_days: u32,
        company_name: impl Into<String>,
        company_address: impl Into<String>,
    ) -> Self {
        Self {
            pay_date,
            working_days,
            company_name: company_name.into(),
            company_address: company_address.into(),
        }
    }

    /// Returns the pay date.
    pub fn pay_date(&self) -> NaiveDate {
        self.pay_date
    }

    /// Returns the number of working days in the period.
    pub fn working_days(&self) -> u32 {
        self.working_days
    }

    /// Returns the employer name.
    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    /// Returns the employer address.
    pub fn company_address(&self) -> &str {
        &self.company_address
    }
}

/// A total that does not fit in a [`Decimal`].
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("{0} is too large to compute")]
pub struct AmountOverflow(pub &'static str);

/// Earnings components of a payslip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Earnings {
    pub basic_pay: Decimal,
    pub housing: Decimal,
    pub transport: Decimal,
    pub other_allowances: Decimal,
}

impl Earnings {
    /// Sum of all earnings components, or `None` on overflow.
    pub fn total(&self) -> Option<Decimal> {
        self.basic_pay
            .checked_add(self.housing)?
            .checked_add(self.transport)?
            .checked_add(self.other_allowances)
    }
}

/// Deduction components of a payslip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Deductions {
    pub tax: Decimal,
    pub employee_pension: Decimal,
    pub other_deductions: Decimal,
}

impl Deductions {
    /// Sum of all deduction components, or `None` on overflow.
    pub fn total(&self) -> Option<Decimal> {
        self.tax
            .checked_add(self.employee_pension)?
            .checked_add(self.other_deductions)
    }
}

/// Totals derived from a record's components.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Totals {
    pub earnings: Decimal,
    pub deductions: Decimal,
    pub net_pay: Decimal,
}

impl Totals {
    fn compute(earnings: &Earnings, deductions: &Deductions) -> Result<Self, AmountOverflow> {
        let total_earnings = earnings.total().ok_or(AmountOverflow("total earnings"))?;
        let total_deductions = deductions.total().ok_or(AmountOverflow("total deductions"))?;
        let net_pay = total_earnings
            .checked_sub(total_deductions)
            .ok_or(AmountOverflow("net pay"))?;
        Ok(Self {
            earnings: total_earnings,
            deductions: total_deductions,
            net_pay,
        })
    }
}

/// One employee's payslip for one pay period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayslipRecord {
    employee_name: String,
    employee_id: String,
    period: PeriodFields,
    earnings: Earnings,
    deductions: Deductions,
    totals: Totals,
}

impl PayslipRecord {
    /// Creates a record from its parts, failing when a total overflows.
    pub fn new(
        employee_name: impl Into<String>,
        employee_id: impl Into<String>,
        period: PeriodFields,
        earnings: Earnings,
        deductions: Deductions,
    ) -> Result<Self, AmountOverflow> {
        Ok(Self {
            employee_name: employee_name.into(),
            employee_id: employee_id.into(),
            period,
            totals: Totals::compute(&earnings, &deductions)?,
            earnings,
            deductions,
        })
    }

    /// Starts a builder for the single-record flow.
    pub fn builder(period: PeriodFields) -> PayslipRecordBuilder {
        PayslipRecordBuilder::new(period)
    }

    /// Returns the employee's full name as entered.
    pub fn employee_name(&self) -> &str {
        &self.employee_name
    }

    /// Returns the employee ID as entered.
    pub fn employee_id(&self) -> &str {
        &self.employee_id
    }

    /// Returns the shared period fields.
    pub fn period(&self) -> &PeriodFields {
        &self.period
    }

    /// Returns the pay date.
    pub fn pay_date(&self) -> NaiveDate {
        self.period.pay_date
    }

    /// Pay date rendered as `YYYY-MM-DD`.
    pub fn pay_date_label(&self) -> String {
        self.period.pay_date.format(PAY_DATE_FORMAT).to_string()
    }

    /// Returns the number of working days in the period.
    pub fn working_days(&self) -> u32 {
        self.period.working_days
    }

    /// Returns the employer name.
    pub fn company_name(&self) -> &str {
        &self.period.company_name
    }

    /// Returns the employer address.
    pub fn company_address(&self) -> &str {
        &self.period.company_address
    }

    /// Returns the earnings components.
    pub fn earnings(&self) -> &Earnings {
        &self.earnings
    }

    /// Returns the deduction components.
    pub fn deductions(&self) -> &Deductions {
        &self.deductions
    }

    /// Returns all derived totals.
    pub fn totals(&self) -> Totals {
        self.totals
    }

    /// Basic pay plus all allowances.
    pub fn total_earnings(&self) -> Decimal {
        self.totals.earnings
    }

    /// Tax plus pension plus other deductions.
    pub fn total_deductions(&self) -> Decimal {
        self.totals.deductions
    }

    /// Total earnings minus total deductions. May be negative.
    pub fn net_pay(&self) -> Decimal {
        self.totals.net_pay
    }
}

/// Builder for [`PayslipRecord`] values; unset amounts default to zero.
#[derive(Clone, Debug)]
pub struct PayslipRecordBuilder {
    employee_name: String,
    employee_id: String,
    period: PeriodFields,
    earnings: Earnings,
    deductions: Deductions,
}

impl PayslipRecordBuilder {
    /// Creates a builder with empty identity fields and zero amounts.
    pub fn new(period: PeriodFields) -> Self {
        Self {
            employee_name: String::new(),
            employee_id: String::new(),
            period,
            earnings: Earnings::default(),
            deductions: Deductions::default(),
        }
    }

    /// Sets the employee name.
    pub fn employee_name(mut self, name: impl Into<String>) -> Self {
        self.employee_name = name.into();
        self
    }

    /// Sets the employee ID.
    pub fn employee_id(mut self, id: impl Into<String>) -> Self {
        self.employee_id = id.into();
        self
    }

    /// Sets basic pay.
    pub fn basic_pay(mut self, amount: Decimal) -> Self {
        self.earnings.basic_pay = amount;
        self
    }

    /// Sets the housing allowance.
    pub fn housing(mut self, amount: Decimal) -> Self {
        self.earnings.housing = amount;
        self
    }

    /// Sets the transport allowance.
    pub fn transport(mut self, amount: Decimal) -> Self {
        self.earnings.transport = amount;
        self
    }

    /// Sets other allowances.
    pub fn other_allowances(mut self, amount: Decimal) -> Self {
        self.earnings.other_allowances = amount;
        self
    }

    /// Sets the tax deduction.
    pub fn tax(mut self, amount: Decimal) -> Self {
        self.deductions.tax = amount;
        self
    }

    /// Sets the employee pension contribution.
    pub fn employee_pension(mut self, amount: Decimal) -> Self {
        self.deductions.employee_pension = amount;
        self
    }

    /// Sets other deductions.
    pub fn other_deductions(mut self, amount: Decimal) -> Self {
        self.deductions.other_deductions = amount;
        self
    }

    /// Finishes the record, failing when a total overflows.
    pub fn build(self) -> Result<PayslipRecord, AmountOverflow> {
        PayslipRecord::new(
            self.employee_name,
            self.employee_id,
            self.period,
            self.earnings,
            self.deductions,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn period() -> PeriodFields {
        PeriodFields::new(
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
            30,
            "Salmnine Investment Ltd",
            "FF Millennium Towers, Ligali Ayorinde, VI, Lagos",
        )
    }

    #[test]
    fn totals_follow_components() {
        let record = PayslipRecord::builder(period())
            .employee_name("James Arthur")
            .employee_id("0077")
            .basic_pay(dec!(400000))
            .housing(dec!(200000))
            .transport(dec!(150000))
            .other_allowances(dec!(25000))
            .tax(dec!(100000))
            .employee_pension(dec!(57000))
            .other_deductions(dec!(0))
            .build()
            .unwrap();

        assert_eq!(record.total_earnings(), dec!(775000));
        assert_eq!(record.total_deductions(), dec!(157000));
        assert_eq!(record.net_pay(), dec!(618000));
    }

    #[test]
    fn totals_invariant_holds_for_fractional_amounts() {
        let samples = [
            (dec!(0.1), dec!(0.2), dec!(0.3), dec!(0.4), dec!(0.05), dec!(0.05), dec!(0.9)),
            (dec!(1234.56), dec!(0), dec!(99.99), dec!(0.01), dec!(10), dec!(20.5), dec!(0)),
            (dec!(0), dec!(0), dec!(0), dec!(0), dec!(1), dec!(2), dec!(3)),
        ];

        for (basic, housing, transport, other, tax, pension, other_ded) in samples {
            let record = PayslipRecord::new(
                "Ada",
                "1",
                period(),
                Earnings {
                    basic_pay: basic,
                    housing,
                    transport,
                    other_allowances: other,
                },
                Deductions {
                    tax,
                    employee_pension: pension,
                    other_deductions: other_ded,
                },
            )
            .unwrap();
            assert_eq!(record.total_earnings(), basic + housing + transport + other);
            assert_eq!(record.total_deductions(), tax + pension + other_ded);
            assert_eq!(
                record.net_pay(),
                record.total_earnings() - record.total_deductions()
            );
        }
    }

    #[test]
    fn net_pay_can_be_negative() {
        let record = PayslipRecord::builder(period())
            .basic_pay(dec!(100))
            .tax(dec!(250))
            .build()
            .unwrap();
        assert_eq!(record.net_pay(), dec!(-150));
    }

    #[test]
    fn pay_date_label_is_iso() {
        let record = PayslipRecord::builder(period()).build().unwrap();
        assert_eq!(record.pay_date_label(), "2024-05-31");
    }

    #[test]
    fn overflowing_totals_are_rejected() {
        let err = PayslipRecord::builder(period())
            .basic_pay(Decimal::MAX)
            .housing(Decimal::MAX)
            .build()
            .unwrap_err();
        assert_eq!(err, AmountOverflow("total earnings"));

        let err = PayslipRecord::builder(period())
            .basic_pay(Decimal::MAX)
            .tax(Decimal::MIN)
            .build()
            .unwrap_err();
        assert_eq!(err, AmountOverflow("net pay"));

        let record = PayslipRecord::builder(period())
            .basic_pay(Decimal::MAX)
            .tax(dec!(1))
            .build()
            .unwrap();
        assert_eq!(record.net_pay(), Decimal::MAX - dec!(1));
    }
}
