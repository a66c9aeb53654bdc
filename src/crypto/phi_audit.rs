// Static scan of every source file for tracing calls that interpolate patient
// or credential fields. Log lines may carry opaque ids and counts only.
