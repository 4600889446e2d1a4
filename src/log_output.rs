use std::io::{self, Write};

use crate::model::MigrationModel;

/// The tabular state-trace contract consumed by MCMC trace loggers.
///
/// Columns appear in a fixed order: one population size per deme,
/// then one backward rate per ordered off-diagonal pair, then one
/// detailed-balance forward rate per ordered pair, then — only when
/// indicator flags are configured — one 0/1 flag per ordered pair.
/// Rates are reported raw, so pathways switched off by an indicator
/// remain visible in the trace.
///
/// Every column is followed by a tab, matching one sample per call to
/// [`TraceLoggable::write_trace_line`].
pub trait TraceLoggable {
    /// Emit the header row of column names.
    fn write_trace_header<W: Write>(&self, out: &mut W) -> io::Result<()>;

    /// Emit one row of current values.
    fn write_trace_line<W: Write>(&self, out: &mut W) -> io::Result<()>;
}

impl TraceLoggable for MigrationModel {
    fn write_trace_header<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let name = self.name();
        let n = self.num_demes();

        for i in 0..n {
            write!(out, "{name}.popSize_{i}\t")?;
        }
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                write!(out, "{name}.rateMatrixBackward_{i}_{j}\t")?;
            }
        }
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                write!(out, "{name}.rateMatrixForward_{i}_{j}\t")?;
            }
        }
        if self.has_rate_flags() {
            for i in 0..n {
                for j in 0..n {
                    if i == j {
                        continue;
                    }
                    write!(out, "{name}.rateMatrixFlag_{i}_{j}\t")?;
                }
            }
        }
        Ok(())
    }

    fn write_trace_line<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let n = self.num_demes();

        for i in 0..n {
            write!(out, "{}\t", self.pop_size(i))?;
        }
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                write!(out, "{}\t", self.rate_raw(i, j))?;
            }
        }
        // Forward rate recovered from the backward rate of the
        // opposite direction via detailed balance.
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let forward = self.rate_raw(j, i) * self.pop_size(j) / self.pop_size(i);
                write!(out, "{forward}\t")?;
            }
        }
        if self.has_rate_flags() {
            for i in 0..n {
                for j in 0..n {
                    if i == j {
                        continue;
                    }
                    write!(out, "{}\t", i32::from(self.rate_flag(i, j)))?;
                }
            }
        }
        Ok(())
    }
}
